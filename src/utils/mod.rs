pub mod error;
pub mod line_printer;
pub mod stop_flag;
