pub mod enums;
pub mod models;
pub mod schema;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod utils;

pub use enums::*;
pub use models::{
    Company, Ticket, TicketComment, TicketHistory, TicketQuery, TicketStats, User,
    ROOT_COMPANY_ID,
};
pub use utils::{create_conn, DbPool};
