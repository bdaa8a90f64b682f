//! Esquema Diesel (escrito a mano; reemplazable con `diesel print-schema`).

diesel::table! {
    file_objects (obj_id) {
        obj_id -> BigInt,
        fs_obj_id -> BigInt,
        meta_addr -> BigInt,
        par_obj_id -> Nullable<BigInt>,
        name -> Text,
        size -> BigInt,
        is_dir -> Bool,
        status -> Integer,
    }
}

diesel::table! {
    blackboard_artifacts (artifact_id) {
        artifact_id -> BigInt,
        obj_id -> BigInt,
        artifact_type_id -> Integer,
    }
}

diesel::table! {
    blackboard_attributes (attribute_id) {
        attribute_id -> BigInt,
        artifact_id -> BigInt,
        obj_id -> BigInt,
        attribute_type_id -> Integer,
        module_name -> Text,
        context -> Text,
        value_type -> Integer,
        value_int32 -> Integer,
        value_int64 -> BigInt,
        value_double -> Double,
        value_text -> Text,
        value_bytes -> Bytea,
    }
}

diesel::table! {
    modules (module_id) {
        module_id -> Integer,
        name -> Text,
        description -> Text,
    }
}

diesel::table! {
    module_status (file_id, module_id) {
        file_id -> BigInt,
        module_id -> Integer,
        status -> Integer,
    }
}

diesel::joinable!(blackboard_attributes -> blackboard_artifacts (artifact_id));

diesel::allow_tables_to_appear_in_same_query!(
    file_objects,
    blackboard_artifacts,
    blackboard_attributes,
    modules,
    module_status,
);
