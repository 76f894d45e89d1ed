diesel::table! {
    accounts (id) {
        id -> Integer,
        username -> Text,
        email -> Text,
        first_name -> Text,
        last_name -> Text,
        password -> Text,
        is_active -> Bool,
        is_activated -> Bool,
        subscribe_to_notifications -> Bool,
        is_staff -> Bool,
        is_superuser -> Bool,
        date_joined -> Timestamp,
        last_login -> Nullable<Timestamp>,
    }
}

diesel::table! {
    rubrics (id) {
        id -> Integer,
        name -> Text,
        sort_order -> SmallInt,
        parent_id -> Nullable<Integer>,
    }
}

diesel::table! {
    articles (id) {
        id -> Integer,
        rubric_id -> Integer,
        title -> Text,
        content -> Text,
        source -> Text,
        characters -> Text,
        image -> Nullable<Text>,
        author_id -> Integer,
        is_active -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    additional_images (id) {
        id -> Integer,
        article_id -> Integer,
        image -> Text,
        caption -> Text,
    }
}

diesel::table! {
    comments (id) {
        id -> Integer,
        article_id -> Integer,
        author -> Text,
        content -> Text,
        is_active -> Bool,
        created_at -> Timestamp,
    }
}

diesel::joinable!(articles -> rubrics (rubric_id));
diesel::joinable!(articles -> accounts (author_id));
diesel::joinable!(additional_images -> articles (article_id));
diesel::joinable!(comments -> articles (article_id));

diesel::allow_tables_to_appear_in_same_query!(
    accounts,
    rubrics,
    articles,
    additional_images,
    comments,
);
