pub(crate) mod canvas;
pub(crate) mod context;
pub(crate) mod feedback;
pub(crate) mod grading;
pub(crate) mod participation;
pub(crate) mod progress;
