pub mod audit_log;
pub mod mailer;

pub use audit_log::AuditLog;
pub use mailer::{mailer_from_config, EmailMessage, MailError, Mailer, MemoryMailer, SmtpMailer};
