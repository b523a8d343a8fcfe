macro_rules! progress {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

pub mod distance;
pub mod error;
pub mod output;
pub mod report;
pub mod rows;
pub mod schema;
pub mod summary;
pub mod tree;
pub mod types;
