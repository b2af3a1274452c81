diesel::table! {
    orders (id) {
        id -> Varchar,
        customer_id -> Nullable<Varchar>,
        items -> Jsonb,
        total_amount -> Numeric,
        status -> Varchar,
        outcome -> Nullable<Jsonb>,
        reconciled_at -> Nullable<Timestamptz>,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    inventory (stock_key) {
        stock_key -> Varchar,
        product_id -> Varchar,
        variant_key -> Nullable<Varchar>,
        current_stock -> Int8,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    sales_counters (product_id) {
        product_id -> Varchar,
        units_sold -> Int8,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    inventory_logs (id) {
        id -> Uuid,
        stock_key -> Varchar,
        product_id -> Varchar,
        variant_key -> Nullable<Varchar>,
        quantity_delta -> Int8,
        reason -> Varchar,
        note -> Text,
        previous_stock -> Int8,
        new_stock -> Int8,
        order_id -> Varchar,
        recorded_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    orders,
    inventory,
    sales_counters,
    inventory_logs,
);
