diesel::table! {
    tickets (id) {
        id -> Int4,
        title -> Varchar,
        description -> Text,
        category -> Varchar,
        urgency -> Varchar,
        status -> Varchar,
        assigned_role -> Nullable<Varchar>,
        company_id -> Int4,
        created_by -> Int4,
        updated_by -> Nullable<Int4>,
        comment -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    ticket_history (id) {
        id -> Int4,
        ticket_id -> Int4,
        user_id -> Int4,
        action_type -> Varchar,
        old_value -> Nullable<Text>,
        new_value -> Nullable<Text>,
        comment -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    ticket_comments (id) {
        id -> Int4,
        ticket_id -> Int4,
        user_id -> Int4,
        comment -> Text,
        created_at -> Timestamptz,
    }
}
