pub mod qloo;
pub mod tags;

pub use qloo::QlooClient;
pub use tags::TagsService;
