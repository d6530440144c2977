pub mod test_client;

pub use test_client::TestClient;
