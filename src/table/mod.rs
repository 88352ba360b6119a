pub mod clearer;
pub mod dynamo;

pub use clearer::*;
pub use dynamo::DynamoReviewTable;
