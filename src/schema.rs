// Diesel table definitions for the harbor database.
// Kept in sync by hand with the DDL in repository::migrations.

diesel::table! {
    accounts (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        url -> Text,
        platform_id -> Nullable<Text>,
        display_name -> Nullable<Text>,
        bio -> Nullable<Text>,
        data -> Nullable<Text>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    account_archives (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        canonical_id -> BigInt,
        archive_session_id -> BigInt,
        url -> Text,
        platform_id -> Nullable<Text>,
        display_name -> Nullable<Text>,
        bio -> Nullable<Text>,
        data -> Nullable<Text>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    posts (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        url -> Text,
        platform_id -> Nullable<Text>,
        account_id -> Nullable<BigInt>,
        account_url -> Nullable<Text>,
        publication_date -> Nullable<Text>,
        caption -> Nullable<Text>,
        data -> Nullable<Text>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    post_archives (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        canonical_id -> BigInt,
        archive_session_id -> BigInt,
        url -> Text,
        platform_id -> Nullable<Text>,
        account_url -> Nullable<Text>,
        publication_date -> Nullable<Text>,
        caption -> Nullable<Text>,
        data -> Nullable<Text>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    media (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        url -> Text,
        platform_id -> Nullable<Text>,
        post_id -> Nullable<BigInt>,
        post_url -> Nullable<Text>,
        local_path -> Nullable<Text>,
        media_type -> Text,
        data -> Nullable<Text>,
        thumbnail_path -> Nullable<Text>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    media_archives (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        canonical_id -> BigInt,
        archive_session_id -> BigInt,
        url -> Text,
        platform_id -> Nullable<Text>,
        post_url -> Nullable<Text>,
        local_path -> Nullable<Text>,
        media_type -> Text,
        data -> Nullable<Text>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    media_parts (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        media_id -> BigInt,
        time_start_ms -> Nullable<BigInt>,
        time_end_ms -> Nullable<BigInt>,
        crop_x -> Nullable<BigInt>,
        crop_y -> Nullable<BigInt>,
        crop_w -> Nullable<BigInt>,
        crop_h -> Nullable<BigInt>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    archive_sessions (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        external_id -> Text,
        archive_location -> Text,
        archived_url -> Nullable<Text>,
        archiving_timestamp -> Nullable<Text>,
        archiving_timezone -> Nullable<Text>,
        parsed_version -> Nullable<Integer>,
        extracted_version -> Nullable<Integer>,
        structures -> Nullable<Text>,
        metadata -> Nullable<Text>,
        attachments -> Nullable<Text>,
        extraction_error -> Nullable<Text>,
        source_type -> Integer,
    }
}

diesel::table! {
    users (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        email -> Text,
        password_hash -> Nullable<Text>,
        locked -> Integer,
        admin -> Integer,
        login_attempts -> Integer,
        last_login -> Nullable<Text>,
    }
}

diesel::table! {
    auth_tokens (id) {
        id -> BigInt,
        create_date -> Text,
        user_id -> BigInt,
        token -> Text,
        last_use -> Text,
    }
}

diesel::table! {
    share_links (id) {
        id -> BigInt,
        create_date -> Text,
        update_date -> Text,
        created_by_user_id -> BigInt,
        entity -> Text,
        entity_id -> BigInt,
        valid -> Integer,
        link_suffix -> Text,
    }
}

diesel::table! {
    tag_types (id) {
        id -> BigInt,
        name -> Text,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    tags (id) {
        id -> BigInt,
        tag_type_id -> Nullable<BigInt>,
        name -> Text,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    account_tags (id) {
        id -> BigInt,
        account_id -> BigInt,
        tag_id -> BigInt,
    }
}

diesel::table! {
    post_tags (id) {
        id -> BigInt,
        post_id -> BigInt,
        tag_id -> BigInt,
    }
}

diesel::table! {
    media_tags (id) {
        id -> BigInt,
        media_id -> BigInt,
        tag_id -> BigInt,
    }
}

diesel::table! {
    event_log (id) {
        id -> BigInt,
        create_date -> Text,
        event_type -> Text,
        user_id -> Nullable<BigInt>,
        path -> Nullable<Text>,
        details -> Nullable<Text>,
    }
}

diesel::joinable!(auth_tokens -> users (user_id));
diesel::joinable!(posts -> accounts (account_id));
diesel::joinable!(media -> posts (post_id));
diesel::joinable!(media_parts -> media (media_id));
diesel::joinable!(tags -> tag_types (tag_type_id));
diesel::joinable!(account_tags -> tags (tag_id));
diesel::joinable!(post_tags -> tags (tag_id));
diesel::joinable!(media_tags -> tags (tag_id));

diesel::allow_tables_to_appear_in_same_query!(auth_tokens, users);
diesel::allow_tables_to_appear_in_same_query!(posts, accounts);
diesel::allow_tables_to_appear_in_same_query!(media, posts);
diesel::allow_tables_to_appear_in_same_query!(tags, tag_types);
diesel::allow_tables_to_appear_in_same_query!(account_tags, tags);
diesel::allow_tables_to_appear_in_same_query!(post_tags, tags);
diesel::allow_tables_to_appear_in_same_query!(media_tags, tags);
diesel::allow_tables_to_appear_in_same_query!(account_archives, accounts);
diesel::allow_tables_to_appear_in_same_query!(post_archives, posts);
diesel::allow_tables_to_appear_in_same_query!(media_archives, media);
