pub mod core;
pub use self::core::*;

pub mod support;
pub use self::support::*;

diesel::joinable!(users -> companies (company_id));
diesel::joinable!(tickets -> companies (company_id));
diesel::joinable!(ticket_history -> tickets (ticket_id));
diesel::joinable!(ticket_comments -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(
    companies,
    users,
    tickets,
    ticket_history,
    ticket_comments,
);
