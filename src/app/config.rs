use crate::config::ResolvedConfig;

pub fn config_output(config: &ResolvedConfig) -> serde_json::Value {
    serde_json::json!({
        "config_file": config.config_path.display().to_string(),
        "data_directory": config.data_dir.display().to_string(),
        "default_user": config.default_user,
        "display": config.display,
        "budget": config.budget,
    })
}
