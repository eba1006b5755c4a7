pub mod request_reader;
pub mod wallet_reader;
