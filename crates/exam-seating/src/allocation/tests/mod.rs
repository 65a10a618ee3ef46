mod common;
mod import;
mod scheduler;
