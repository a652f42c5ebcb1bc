pub mod db_utils;
pub mod employee_filter;
pub mod shift_cache;
