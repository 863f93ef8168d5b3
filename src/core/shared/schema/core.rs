diesel::table! {
    companies (id) {
        id -> Int4,
        name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Int4,
        email -> Varchar,
        password_hash -> Varchar,
        full_name -> Varchar,
        role -> Varchar,
        company_id -> Int4,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}
