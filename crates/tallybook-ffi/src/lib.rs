use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;

use tallybook::config::ResolvedConfig;

/// Allocates a C string containing the tallybook-ffi version.
///
/// Call `tallybook_ffi_string_free` to free the returned pointer.
#[no_mangle]
pub extern "C" fn tallybook_ffi_version() -> *mut c_char {
    CString::new(env!("CARGO_PKG_VERSION"))
        .expect("version should be valid C string")
        .into_raw()
}

/// Frees a string allocated by this library.
#[no_mangle]
pub extern "C" fn tallybook_ffi_string_free(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(s));
    }
}

fn error_json(err: &anyhow::Error) -> String {
    serde_json::json!({ "error": format!("{err:#}") }).to_string()
}

fn into_c_string(s: String) -> *mut c_char {
    // serde_json escapes NUL, so this only falls back on a broken invariant.
    CString::new(s).unwrap_or_default().into_raw()
}

unsafe fn arg<'a>(name: &str, ptr: *const c_char) -> anyhow::Result<Option<&'a str>> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("{name} is not valid UTF-8"))
}

/// Monthly snapshot for `user_id` as JSON, reading the file store under
/// `data_dir`. A `tallybook.toml` in `data_dir` is honored if present.
///
/// `period` may be null for the current month.
fn monthly_snapshot_json(
    data_dir: &Path,
    user_id: &str,
    period: Option<&str>,
) -> anyhow::Result<String> {
    let config = ResolvedConfig::load_or_default(&data_dir.join("tallybook.toml"))?;
    let user = tallybook::app::resolve_user(&config, Some(user_id))?;
    let (_storage, engine) = tallybook::app::open(&config);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let out = rt.block_on(tallybook::app::monthly_snapshot(
        &engine, &config, &user, period,
    ))?;
    Ok(serde_json::to_string(&out)?)
}

/// Returns the monthly snapshot JSON, or `{"error": "..."}` on failure.
///
/// # Safety
///
/// `data_dir` and `user_id` must be valid NUL-terminated strings. `period`
/// must be such a string or null. Free the result with
/// `tallybook_ffi_string_free`.
#[no_mangle]
pub unsafe extern "C" fn tallybook_ffi_monthly_snapshot_json(
    data_dir: *const c_char,
    user_id: *const c_char,
    period: *const c_char,
) -> *mut c_char {
    let result = (|| {
        let data_dir =
            arg("data_dir", data_dir)?.ok_or_else(|| anyhow::anyhow!("data_dir is null"))?;
        let user_id = arg("user_id", user_id)?.ok_or_else(|| anyhow::anyhow!("user_id is null"))?;
        let period = arg("period", period)?;
        monthly_snapshot_json(Path::new(data_dir), user_id, period)
    })();

    into_c_string(result.unwrap_or_else(|e| error_json(&e)))
}

// Android entrypoint used by the mobile shell's Kotlin code.
#[cfg(target_os = "android")]
mod android {
    use std::path::Path;

    use jni::objects::{JClass, JString};
    use jni::sys::jstring;
    use jni::JNIEnv;

    fn jstring_to_string(env: &mut JNIEnv, s: JString) -> anyhow::Result<String> {
        Ok(env.get_string(&s)?.into())
    }

    fn ok(env: &mut JNIEnv, s: impl AsRef<str>) -> jstring {
        env.new_string(s.as_ref())
            .expect("Couldn't create java string")
            .into_raw()
    }

    #[no_mangle]
    pub extern "system" fn Java_expo_modules_tallybooknative_TallybookNativeRust_version(
        mut env: JNIEnv,
        _class: JClass,
    ) -> jstring {
        ok(&mut env, env!("CARGO_PKG_VERSION"))
    }

    #[no_mangle]
    pub extern "system" fn Java_expo_modules_tallybooknative_TallybookNativeRust_monthlySnapshot(
        mut env: JNIEnv,
        _class: JClass,
        data_dir: JString,
        user_id: JString,
        period: JString,
    ) -> jstring {
        let args = (|| {
            Ok::<_, anyhow::Error>((
                jstring_to_string(&mut env, data_dir)?,
                jstring_to_string(&mut env, user_id)?,
                jstring_to_string(&mut env, period)?,
            ))
        })();
        let (data_dir, user_id, period) = match args {
            Ok(args) => args,
            Err(e) => return ok(&mut env, super::error_json(&e)),
        };

        // An empty period means the current month.
        let period = Some(period.as_str()).filter(|p| !p.is_empty());
        match super::monthly_snapshot_json(Path::new(&data_dir), &user_id, period) {
            Ok(json) => ok(&mut env, json),
            Err(e) => ok(&mut env, super::error_json(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(ptr: *mut c_char) -> String {
        let s = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        tallybook_ffi_string_free(ptr);
        s
    }

    #[test]
    fn version_round_trips_through_free() {
        assert_eq!(take(tallybook_ffi_version()), env!("CARGO_PKG_VERSION"));
        tallybook_ffi_string_free(std::ptr::null_mut());
    }

    #[test]
    fn snapshot_for_empty_data_dir_is_all_zero() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let data_dir = CString::new(dir.path().to_string_lossy().into_owned())?;
        let user = CString::new("alex")?;
        let period = CString::new("2024-03")?;

        let json = take(unsafe {
            tallybook_ffi_monthly_snapshot_json(data_dir.as_ptr(), user.as_ptr(), period.as_ptr())
        });
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value["period"], "2024-03");
        assert_eq!(value["total_spent"], "0");
        assert_eq!(value["display_state"], "no-budget-set");
        Ok(())
    }

    #[test]
    fn errors_come_back_as_json() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let data_dir = CString::new(dir.path().to_string_lossy().into_owned())?;
        let user = CString::new("alex")?;
        let period = CString::new("March")?;

        let json = take(unsafe {
            tallybook_ffi_monthly_snapshot_json(data_dir.as_ptr(), user.as_ptr(), period.as_ptr())
        });
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert!(value["error"].as_str().unwrap().contains("Invalid period"));

        let no_user = std::ptr::null();
        let json = take(unsafe {
            tallybook_ffi_monthly_snapshot_json(data_dir.as_ptr(), no_user, period.as_ptr())
        });
        assert!(json.contains("user_id is null"));
        Ok(())
    }
}
