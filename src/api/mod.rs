pub(crate) mod assignments;
pub(crate) mod courses;
pub(crate) mod discussions;
pub(crate) mod errors;
pub(crate) mod feedback;
pub(crate) mod grades;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod quizzes;
pub(crate) mod router;
pub(crate) mod settings;
pub(crate) mod validation;
