pub mod audits;
pub mod books;
pub mod health;
