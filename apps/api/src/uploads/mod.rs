// Uploads: CSV data files and example reports, stored per project.

pub mod handlers;
