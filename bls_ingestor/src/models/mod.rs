pub mod request_params;
pub mod row;
pub mod series;
