pub mod content;
pub mod engagement;
pub mod locale;
pub mod social_graph;
pub mod user;
