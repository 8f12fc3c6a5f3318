pub mod email_filter;
pub mod employee_cache;
pub mod object_id;
pub mod time;
