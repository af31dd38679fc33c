mod fake;
mod tokio_postgres;

pub use self::fake::FakeDriver;
pub use self::tokio_postgres::TokioPostgresDriver;
