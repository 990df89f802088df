pub mod canvas;
pub mod formatter;
pub mod openai;
pub mod planner;
pub mod prompt;
