pub mod example;
pub mod project;
pub mod template;

use serde::Deserialize;

/// `?project_id=` accepted by most project-scoped routes.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub project_id: Option<String>,
}
