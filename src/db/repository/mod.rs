pub mod maintenance_interval;
pub mod maintenance_log;
pub mod print_job;
pub mod printer;
pub mod user;

pub use maintenance_interval::MaintenanceIntervalRepository;
pub use maintenance_log::MaintenanceLogRepository;
pub use print_job::{PrintJobRecord, PrintJobRepository};
pub use printer::PrinterRepository;
pub use user::UserRepository;
