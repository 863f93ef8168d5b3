use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::{debug, error};
use std::collections::{BTreeMap, BTreeSet};

use super::{CommitReceipt, HelpdeskStore, StoreError, StoreResult, WriteBatch, WriteOp};
use crate::core::shared::models::{
    Company, NewTicket, NewTicketComment, NewTicketHistory, NewUser, Ticket, TicketChanges,
    TicketComment, TicketHistory, TicketQuery, TicketStats, User, UserChanges,
};
use crate::core::shared::schema::{companies, ticket_comments, ticket_history, tickets, users};
use crate::core::shared::utils::DbPool;
use crate::core::shared::TicketStatus;

// ============================================================================
// ROW TYPES
// ============================================================================

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = companies)]
pub struct DbCompany {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = companies)]
pub struct NewDbCompany<'a> {
    pub name: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = users)]
pub struct DbUser {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub company_id: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewDbUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub company_id: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct DbUserChangeset {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub company_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = tickets)]
pub struct DbTicket {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub urgency: String,
    pub status: String,
    pub assigned_role: Option<String>,
    pub company_id: i32,
    pub created_by: i32,
    pub updated_by: Option<i32>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tickets)]
pub struct NewDbTicket {
    pub title: String,
    pub description: String,
    pub category: String,
    pub urgency: String,
    pub status: String,
    pub assigned_role: Option<String>,
    pub company_id: i32,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = tickets)]
pub struct DbTicketChangeset {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub urgency: Option<String>,
    pub status: Option<String>,
    pub assigned_role: Option<Option<String>>,
    pub comment: Option<String>,
    pub updated_by: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = ticket_history)]
pub struct DbTicketHistory {
    pub id: i32,
    pub ticket_id: i32,
    pub user_id: i32,
    pub action_type: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ticket_history)]
pub struct NewDbTicketHistory {
    pub ticket_id: i32,
    pub user_id: i32,
    pub action_type: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = ticket_comments)]
pub struct DbTicketComment {
    pub id: i32,
    pub ticket_id: i32,
    pub user_id: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ticket_comments)]
pub struct NewDbTicketComment {
    pub ticket_id: i32,
    pub user_id: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// CONVERSIONS
// ============================================================================

fn parse_column<T: std::str::FromStr<Err = String>>(value: &str) -> StoreResult<T> {
    value.parse().map_err(StoreError::Corrupt)
}

pub fn db_company_to_company(db: DbCompany) -> Company {
    Company {
        id: db.id,
        name: db.name,
        created_at: db.created_at,
    }
}

pub fn db_user_to_user(db: DbUser) -> StoreResult<User> {
    Ok(User {
        role: parse_column(&db.role)?,
        id: db.id,
        email: db.email,
        password_hash: db.password_hash,
        full_name: db.full_name,
        company_id: db.company_id,
        is_active: db.is_active,
        created_at: db.created_at,
    })
}

pub fn db_ticket_to_ticket(db: DbTicket) -> StoreResult<Ticket> {
    Ok(Ticket {
        category: parse_column(&db.category)?,
        urgency: parse_column(&db.urgency)?,
        status: parse_column(&db.status)?,
        assigned_role: db
            .assigned_role
            .as_deref()
            .map(parse_column)
            .transpose()?,
        id: db.id,
        title: db.title,
        description: db.description,
        company_id: db.company_id,
        created_by: db.created_by,
        updated_by: db.updated_by,
        comment: db.comment,
        created_at: db.created_at,
        updated_at: db.updated_at,
    })
}

pub fn db_history_to_history(db: DbTicketHistory) -> StoreResult<TicketHistory> {
    Ok(TicketHistory {
        action_type: parse_column(&db.action_type)?,
        id: db.id,
        ticket_id: db.ticket_id,
        user_id: db.user_id,
        old_value: db.old_value,
        new_value: db.new_value,
        comment: db.comment,
        created_at: db.created_at,
    })
}

pub fn db_comment_to_comment(db: DbTicketComment) -> TicketComment {
    TicketComment {
        id: db.id,
        ticket_id: db.ticket_id,
        user_id: db.user_id,
        comment: db.comment,
        created_at: db.created_at,
    }
}

impl From<&UserChanges> for DbUserChangeset {
    fn from(changes: &UserChanges) -> Self {
        Self {
            email: changes.email.clone(),
            password_hash: changes.password_hash.clone(),
            full_name: changes.full_name.clone(),
            role: changes.role.map(|r| r.to_string()),
            company_id: changes.company_id,
            is_active: changes.is_active,
        }
    }
}

impl From<TicketChanges> for DbTicketChangeset {
    fn from(changes: TicketChanges) -> Self {
        Self {
            title: changes.title,
            description: changes.description,
            category: changes.category.map(|c| c.to_string()),
            urgency: changes.urgency.map(|u| u.to_string()),
            status: changes.status.map(|s| s.to_string()),
            assigned_role: changes
                .assigned_role
                .map(|role| role.map(|r| r.to_string())),
            comment: changes.comment,
            updated_by: Some(changes.updated_by),
            updated_at: changes.updated_at,
        }
    }
}

impl From<NewTicketHistory> for NewDbTicketHistory {
    fn from(row: NewTicketHistory) -> Self {
        Self {
            ticket_id: row.ticket_id,
            user_id: row.user_id,
            action_type: row.action_type.to_string(),
            old_value: row.old_value,
            new_value: row.new_value,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

impl From<NewTicketComment> for NewDbTicketComment {
    fn from(row: NewTicketComment) -> Self {
        Self {
            ticket_id: row.ticket_id,
            user_id: row.user_id,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::MissingRow("record not found".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::UniqueViolation(info.message().to_string())
            }
            DieselError::RollbackErrorOnCommit { .. } | DieselError::BrokenTransactionManager => {
                Self::RollbackFailed(err.to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PgHelpdeskStore {
    pool: DbPool,
}

impl PgHelpdeskStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> StoreResult<PgPooled> {
        self.pool
            .get()
            .map_err(|e| StoreError::Database(format!("DB pool error: {e}")))
    }
}

fn scoped_tickets(query: &TicketQuery) -> tickets::BoxedQuery<'static, Pg> {
    let mut q = tickets::table.into_boxed();

    if let Some(company_id) = query.company_id {
        q = q.filter(tickets::company_id.eq(company_id));
    }
    if let Some(created_by) = query.created_by {
        q = q.filter(tickets::created_by.eq(created_by));
    }
    if !query.include_hidden {
        q = q.filter(tickets::status.ne(TicketStatus::Hidden.to_string()));
    }
    if let Some(status) = query.status {
        q = q.filter(tickets::status.eq(status.to_string()));
    }
    if let Some(category) = query.category {
        q = q.filter(tickets::category.eq(category.to_string()));
    }
    if let Some(urgency) = query.urgency {
        q = q.filter(tickets::urgency.eq(urgency.to_string()));
    }
    if let Some(role) = query.assigned_role {
        q = q.filter(tickets::assigned_role.eq(role.to_string()));
    }

    q
}

fn add_counts(bucket: &mut BTreeMap<String, i64>, rows: Vec<(String, i64)>) {
    for (value, count) in rows {
        *bucket.entry(value).or_insert(0) += count;
    }
}

fn apply_op(
    conn: &mut PgConnection,
    op: WriteOp,
    receipt: &mut CommitReceipt,
    history_failed: &mut bool,
) -> StoreResult<()> {
    debug!("Applying write op {}", op.name());
    match op {
        WriteOp::UpdateTicket { ticket_id, changes } => {
            let changeset = DbTicketChangeset::from(changes);
            let updated = diesel::update(tickets::table.find(ticket_id))
                .set(&changeset)
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::MissingRow(format!("ticket {ticket_id}")));
            }
        }
        WriteOp::AppendHistory(row) => {
            let inserted: DbTicketHistory = diesel::insert_into(ticket_history::table)
                .values(&NewDbTicketHistory::from(row))
                .get_result(conn)
                .map_err(|e| {
                    *history_failed = true;
                    StoreError::HistoryAppend(e.to_string())
                })?;
            receipt.history.push(db_history_to_history(inserted)?);
        }
        WriteOp::InsertComment(row) => {
            let inserted: DbTicketComment = diesel::insert_into(ticket_comments::table)
                .values(&NewDbTicketComment::from(row))
                .get_result(conn)?;
            receipt.comments.push(db_comment_to_comment(inserted));
        }
        WriteOp::DeleteTicketHistory { ticket_id } => {
            diesel::delete(ticket_history::table.filter(ticket_history::ticket_id.eq(ticket_id)))
                .execute(conn)?;
        }
        WriteOp::DeleteTicketComments { ticket_id } => {
            diesel::delete(
                ticket_comments::table.filter(ticket_comments::ticket_id.eq(ticket_id)),
            )
            .execute(conn)?;
        }
        WriteOp::DeleteTicket { ticket_id } => {
            let deleted = diesel::delete(tickets::table.find(ticket_id)).execute(conn)?;
            if deleted == 0 {
                return Err(StoreError::MissingRow(format!("ticket {ticket_id}")));
            }
        }
        WriteOp::ReassignUsers {
            from_company,
            to_company,
        } => {
            diesel::update(users::table.filter(users::company_id.eq(from_company)))
                .set(users::company_id.eq(to_company))
                .execute(conn)?;
        }
        WriteOp::ReassignTickets {
            from_company,
            to_company,
        } => {
            diesel::update(tickets::table.filter(tickets::company_id.eq(from_company)))
                .set(tickets::company_id.eq(to_company))
                .execute(conn)?;
        }
        WriteOp::DeleteCompanyUsers { company_id } => {
            diesel::delete(users::table.filter(users::company_id.eq(company_id))).execute(conn)?;
        }
        WriteOp::DeleteCompany { company_id } => {
            let deleted = diesel::delete(companies::table.find(company_id)).execute(conn)?;
            if deleted == 0 {
                return Err(StoreError::MissingRow(format!("company {company_id}")));
            }
        }
    }
    Ok(())
}

impl HelpdeskStore for PgHelpdeskStore {
    fn ping(&self) -> bool {
        self.pool.get().is_ok()
    }

    fn get_company(&self, id: i32) -> StoreResult<Option<Company>> {
        let mut conn = self.conn()?;
        let row: Option<DbCompany> = companies::table.find(id).first(&mut conn).optional()?;
        Ok(row.map(db_company_to_company))
    }

    fn list_companies(&self) -> StoreResult<Vec<Company>> {
        let mut conn = self.conn()?;
        let rows: Vec<DbCompany> = companies::table
            .order(companies::id.asc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(db_company_to_company).collect())
    }

    fn create_company(&self, name: &str) -> StoreResult<Company> {
        let mut conn = self.conn()?;
        let row: DbCompany = diesel::insert_into(companies::table)
            .values(&NewDbCompany {
                name,
                created_at: Utc::now(),
            })
            .get_result(&mut conn)?;
        Ok(db_company_to_company(row))
    }

    fn rename_company(&self, id: i32, name: &str) -> StoreResult<Company> {
        let mut conn = self.conn()?;
        let row: DbCompany = diesel::update(companies::table.find(id))
            .set(companies::name.eq(name))
            .get_result(&mut conn)?;
        Ok(db_company_to_company(row))
    }

    fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        let mut conn = self.conn()?;
        let row: Option<DbUser> = users::table.find(id).first(&mut conn).optional()?;
        row.map(db_user_to_user).transpose()
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn()?;
        let row: Option<DbUser> = users::table
            .filter(users::email.eq(email))
            .first(&mut conn)
            .optional()?;
        row.map(db_user_to_user).transpose()
    }

    fn list_users(&self, company_id: Option<i32>) -> StoreResult<Vec<User>> {
        let mut conn = self.conn()?;
        let mut q = users::table.into_boxed();
        if let Some(company_id) = company_id {
            q = q.filter(users::company_id.eq(company_id));
        }
        let rows: Vec<DbUser> = q.order(users::id.asc()).load(&mut conn)?;
        rows.into_iter().map(db_user_to_user).collect()
    }

    fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut conn = self.conn()?;
        let row: DbUser = diesel::insert_into(users::table)
            .values(&NewDbUser {
                email: user.email,
                password_hash: user.password_hash,
                full_name: user.full_name,
                role: user.role.to_string(),
                company_id: user.company_id,
                is_active: user.is_active,
                created_at: Utc::now(),
            })
            .get_result(&mut conn)?;
        db_user_to_user(row)
    }

    fn update_user(&self, id: i32, changes: &UserChanges) -> StoreResult<User> {
        if changes.is_empty() {
            return self
                .get_user(id)?
                .ok_or_else(|| StoreError::MissingRow(format!("user {id}")));
        }
        let mut conn = self.conn()?;
        let row: DbUser = diesel::update(users::table.find(id))
            .set(&DbUserChangeset::from(changes))
            .get_result(&mut conn)?;
        db_user_to_user(row)
    }

    fn delete_user(&self, id: i32) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(users::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(StoreError::MissingRow(format!("user {id}")));
        }
        Ok(())
    }

    fn count_user_references(&self, id: i32) -> StoreResult<i64> {
        let mut conn = self.conn()?;
        let created: i64 = tickets::table
            .filter(tickets::created_by.eq(id))
            .count()
            .get_result(&mut conn)?;
        let updated: i64 = tickets::table
            .filter(tickets::updated_by.eq(id))
            .count()
            .get_result(&mut conn)?;
        let history: i64 = ticket_history::table
            .filter(ticket_history::user_id.eq(id))
            .count()
            .get_result(&mut conn)?;
        let comments: i64 = ticket_comments::table
            .filter(ticket_comments::user_id.eq(id))
            .count()
            .get_result(&mut conn)?;
        Ok(created + updated + history + comments)
    }

    fn users_referenced_outside(&self, company_id: i32) -> StoreResult<Vec<i32>> {
        let mut conn = self.conn()?;
        let members: Vec<i32> = users::table
            .filter(users::company_id.eq(company_id))
            .select(users::id)
            .load(&mut conn)?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let created: Vec<i32> = tickets::table
            .filter(tickets::company_id.ne(company_id))
            .filter(tickets::created_by.eq_any(&members))
            .select(tickets::created_by)
            .load(&mut conn)?;
        let updated: Vec<Option<i32>> = tickets::table
            .filter(tickets::company_id.ne(company_id))
            .filter(tickets::updated_by.eq_any(&members))
            .select(tickets::updated_by)
            .load(&mut conn)?;
        let history: Vec<i32> = ticket_history::table
            .inner_join(tickets::table)
            .filter(tickets::company_id.ne(company_id))
            .filter(ticket_history::user_id.eq_any(&members))
            .select(ticket_history::user_id)
            .load(&mut conn)?;
        let comments: Vec<i32> = ticket_comments::table
            .inner_join(tickets::table)
            .filter(tickets::company_id.ne(company_id))
            .filter(ticket_comments::user_id.eq_any(&members))
            .select(ticket_comments::user_id)
            .load(&mut conn)?;

        let referenced: BTreeSet<i32> = created
            .into_iter()
            .chain(updated.into_iter().flatten())
            .chain(history)
            .chain(comments)
            .collect();
        Ok(referenced.into_iter().collect())
    }

    fn get_ticket(&self, id: i32) -> StoreResult<Option<Ticket>> {
        let mut conn = self.conn()?;
        let row: Option<DbTicket> = tickets::table.find(id).first(&mut conn).optional()?;
        row.map(db_ticket_to_ticket).transpose()
    }

    fn list_tickets(&self, query: &TicketQuery) -> StoreResult<Vec<Ticket>> {
        let mut conn = self.conn()?;
        let mut q = scoped_tickets(query).order((tickets::created_at.desc(), tickets::id.desc()));
        if let Some(limit) = query.limit {
            q = q.limit(limit);
        }
        let rows: Vec<DbTicket> = q.load(&mut conn)?;
        rows.into_iter().map(db_ticket_to_ticket).collect()
    }

    fn create_ticket(&self, ticket: NewTicket) -> StoreResult<Ticket> {
        let mut conn = self.conn()?;
        let now = Utc::now();
        let row: DbTicket = diesel::insert_into(tickets::table)
            .values(&NewDbTicket {
                title: ticket.title,
                description: ticket.description,
                category: ticket.category.to_string(),
                urgency: ticket.urgency.to_string(),
                status: TicketStatus::Open.to_string(),
                assigned_role: ticket.assigned_role.map(|r| r.to_string()),
                company_id: ticket.company_id,
                created_by: ticket.created_by,
                created_at: now,
                updated_at: now,
            })
            .get_result(&mut conn)?;
        db_ticket_to_ticket(row)
    }

    fn ticket_ids_for_company(&self, company_id: i32) -> StoreResult<Vec<i32>> {
        let mut conn = self.conn()?;
        let ids: Vec<i32> = tickets::table
            .filter(tickets::company_id.eq(company_id))
            .select(tickets::id)
            .order(tickets::id.asc())
            .load(&mut conn)?;
        Ok(ids)
    }

    fn ticket_history(&self, ticket_id: i32) -> StoreResult<Vec<TicketHistory>> {
        let mut conn = self.conn()?;
        let rows: Vec<DbTicketHistory> = ticket_history::table
            .filter(ticket_history::ticket_id.eq(ticket_id))
            .order((ticket_history::created_at.asc(), ticket_history::id.asc()))
            .load(&mut conn)?;
        rows.into_iter().map(db_history_to_history).collect()
    }

    fn ticket_comments(&self, ticket_id: i32) -> StoreResult<Vec<TicketComment>> {
        let mut conn = self.conn()?;
        let rows: Vec<DbTicketComment> = ticket_comments::table
            .filter(ticket_comments::ticket_id.eq(ticket_id))
            .order((ticket_comments::created_at.asc(), ticket_comments::id.asc()))
            .load(&mut conn)?;
        Ok(rows.into_iter().map(db_comment_to_comment).collect())
    }

    fn ticket_stats(&self, query: &TicketQuery) -> StoreResult<TicketStats> {
        let mut conn = self.conn()?;
        let by_status: Vec<(String, i64)> = scoped_tickets(query)
            .group_by(tickets::status)
            .select((tickets::status, count_star()))
            .load(&mut conn)?;
        let by_category: Vec<(String, i64)> = scoped_tickets(query)
            .group_by(tickets::category)
            .select((tickets::category, count_star()))
            .load(&mut conn)?;
        let by_urgency: Vec<(String, i64)> = scoped_tickets(query)
            .group_by(tickets::urgency)
            .select((tickets::urgency, count_star()))
            .load(&mut conn)?;

        let mut stats = TicketStats::zeroed(query.include_hidden);
        stats.total = by_status.iter().map(|(_, n)| n).sum();
        add_counts(&mut stats.by_status, by_status);
        add_counts(&mut stats.by_category, by_category);
        add_counts(&mut stats.by_urgency, by_urgency);
        Ok(stats)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<CommitReceipt> {
        if batch.is_empty() {
            return Ok(CommitReceipt::default());
        }
        let mut conn = self.conn()?;
        let mut history_failed = false;

        let result = conn.transaction::<CommitReceipt, StoreError, _>(|conn| {
            let mut receipt = CommitReceipt::default();
            for op in batch.into_ops() {
                apply_op(conn, op, &mut receipt, &mut history_failed)?;
            }
            Ok(receipt)
        });

        match result {
            Err(StoreError::HistoryAppend(msg)) => Err(StoreError::HistoryAppend(msg)),
            Err(other) if history_failed => {
                error!("Rollback after failed history append did not complete: {other}");
                Err(StoreError::RollbackFailed(other.to_string()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::TicketCategory;

    #[test]
    fn test_scoped_tickets_sql_follows_scope() {
        let query = TicketQuery {
            company_id: Some(2),
            category: Some(TicketCategory::Bug),
            ..TicketQuery::default()
        };
        let sql = diesel::debug_query::<Pg, _>(&scoped_tickets(&query)).to_string();
        assert!(sql.contains("FROM \"tickets\""), "{sql}");
        assert!(sql.contains("\"tickets\".\"company_id\" = $1"), "{sql}");
        assert!(sql.contains("\"tickets\".\"status\" != $2"), "{sql}");
        assert!(sql.contains("\"tickets\".\"category\" = $3"), "{sql}");
        assert!(sql.contains("\"hidden\""), "{sql}");
        assert!(!sql.contains("created_by\" ="), "{sql}");

        let owner_view = TicketQuery {
            include_hidden: true,
            ..TicketQuery::default()
        };
        let sql = diesel::debug_query::<Pg, _>(&scoped_tickets(&owner_view)).to_string();
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    #[test]
    fn test_stats_sql_groups_in_the_database() {
        let query = TicketQuery {
            created_by: Some(7),
            ..TicketQuery::default()
        };
        let grouped = scoped_tickets(&query)
            .group_by(tickets::urgency)
            .select((tickets::urgency, count_star()));
        let sql = diesel::debug_query::<Pg, _>(&grouped).to_string();
        assert!(sql.contains("COUNT(*)"), "{sql}");
        assert!(sql.contains("GROUP BY \"tickets\".\"urgency\""), "{sql}");
        assert!(sql.contains("\"tickets\".\"created_by\" = $1"), "{sql}");
    }

    #[test]
    fn test_add_counts_merges_into_zeroed_buckets() {
        let mut stats = TicketStats::zeroed(false);
        add_counts(
            &mut stats.by_status,
            vec![("open".to_string(), 3), ("closed".to_string(), 1)],
        );
        assert_eq!(stats.by_status["open"], 3);
        assert_eq!(stats.by_status["in_progress"], 0);
        assert!(!stats.by_status.contains_key("hidden"));
    }
}
