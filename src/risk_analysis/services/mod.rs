pub mod prompt_builder;
pub mod range_matcher;
pub mod severity_classifier;
pub mod summary_parser;

pub use prompt_builder::PromptBuilder;
pub use range_matcher::RangeMatcher;
pub use severity_classifier::SeverityClassifier;
pub use summary_parser::SummaryParser;
