pub mod history;

// Re-export commonly used types
pub use history::HistoryLog;
