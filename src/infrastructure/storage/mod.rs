mod working_storage;

pub use working_storage::WorkingStorage;
