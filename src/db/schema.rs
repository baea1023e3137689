// Diesel schema for the complaint intake store
use diesel::allow_tables_to_appear_in_same_query;
use diesel::table;

table! {
    complaints (id) {
        id -> BigInt,
        tracking_code -> Text,
        session_id -> Text,
        summary -> Text,
        object_id -> Integer,
        jurisdiction_id -> Integer,
        plaintiff_kind -> Text,
        plaintiff_first_name -> Text,
        plaintiff_last_name -> Text,
        plaintiff_national_id -> Text,
        plaintiff_email -> Nullable<Text>,
        plaintiff_phone -> Nullable<Text>,
        plaintiff_country_id -> Integer,
        plaintiff_city_id -> Integer,
        plaintiff_profession_id -> Integer,
        defendant_kind -> Text,
        defendant_first_name -> Nullable<Text>,
        defendant_last_name -> Nullable<Text>,
        defendant_commercial_name -> Nullable<Text>,
        created_at -> BigInt,
    }
}

table! {
    attachments (id) {
        id -> BigInt,
        complaint_id -> BigInt,
        stored_name -> Text,
        extension -> Text,
        media_type -> Text,
        created_at -> BigInt,
    }
}

table! {
    countries (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    cities (id) {
        id -> Integer,
        country_id -> Integer,
        name -> Text,
    }
}

table! {
    professions (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    jurisdictions (id) {
        id -> Integer,
        name -> Text,
    }
}

table! {
    complaint_objects (id) {
        id -> Integer,
        name -> Text,
    }
}

allow_tables_to_appear_in_same_query!(
    complaints,
    attachments,
    countries,
    cities,
    professions,
    jurisdictions,
    complaint_objects,
);
