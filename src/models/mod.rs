mod budget;
mod category;
mod error;
mod expense;
mod id;
mod id_generator;
mod period;

pub use budget::{BudgetPeriod, CategoryAllocation};
pub use category::{tidy, CategoryCatalog, CategoryKey, DEFAULT_CATEGORIES};
pub use error::ValidationError;
pub use expense::{Expense, MAX_AMOUNT};
pub use id::{Id, IdError};
pub use id_generator::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use period::{parse_date, DateRange, PeriodKey};
