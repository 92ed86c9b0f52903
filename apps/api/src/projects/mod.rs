// Projects: CRUD, chapter lists, per-chapter data and seeding.

pub mod handlers;
