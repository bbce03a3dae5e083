use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_restaurants_and_drivers::Migration),
            Box::new(m20240101_000002_create_orders_tables::Migration),
            Box::new(m20240101_000003_create_menu_tables::Migration),
            Box::new(m20240101_000004_create_promotion_tables::Migration),
            Box::new(m20240101_000005_create_outbox_events_table::Migration),
        ]
    }
}

fn money(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(12, 2)
        .not_null()
        .default(0)
        .to_owned()
}

fn sort_order(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col).integer().not_null().default(0).to_owned()
}

fn flag(col: impl IntoIden, default: bool) -> ColumnDef {
    ColumnDef::new(col)
        .boolean()
        .not_null()
        .default(default)
        .to_owned()
}

fn cascade_fk(
    name: &str,
    from: (impl IntoIden + 'static, impl IntoIden + 'static),
    to: (impl IntoIden + 'static, impl IntoIden + 'static),
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(from.0, from.1)
        .to(to.0, to.1)
        .on_delete(ForeignKeyAction::Cascade)
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

mod m20240101_000001_create_restaurants_and_drivers {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_restaurants_and_drivers"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Restaurants::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Restaurants::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Restaurants::Name).string().not_null())
                        .col(
                            ColumnDef::new(Restaurants::Slug)
                                .string_len(120)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Restaurants::Phone).string().null())
                        .col(ColumnDef::new(Restaurants::Address).string().null())
                        .col(flag(Restaurants::IsActive, true))
                        .col(money(Restaurants::DeliveryFee))
                        .col(
                            ColumnDef::new(Restaurants::UtcOffsetMinutes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Restaurants::OrderPrefix)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Restaurants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Restaurants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Drivers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Drivers::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Drivers::RestaurantId).uuid().not_null())
                        .col(ColumnDef::new(Drivers::Name).string().not_null())
                        .col(ColumnDef::new(Drivers::Phone).string().not_null())
                        .col(ColumnDef::new(Drivers::Email).string().null())
                        .col(flag(Drivers::IsActive, true))
                        .col(flag(Drivers::IsAvailable, true))
                        .col(ColumnDef::new(Drivers::CurrentLatitude).decimal_len(10, 7).null())
                        .col(ColumnDef::new(Drivers::CurrentLongitude).decimal_len(10, 7).null())
                        .col(
                            ColumnDef::new(Drivers::LastLoginAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Drivers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Drivers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(&mut cascade_fk(
                            "fk_drivers_restaurant",
                            (Drivers::Table, Drivers::RestaurantId),
                            (Restaurants::Table, Restaurants::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_drivers_restaurant_id")
                        .table(Drivers::Table)
                        .col(Drivers::RestaurantId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Drivers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Restaurants::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Restaurants {
        Table,
        Id,
        Name,
        Slug,
        Phone,
        Address,
        IsActive,
        DeliveryFee,
        UtcOffsetMinutes,
        OrderPrefix,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Drivers {
        Table,
        Id,
        RestaurantId,
        Name,
        Phone,
        Email,
        IsActive,
        IsAvailable,
        CurrentLatitude,
        CurrentLongitude,
        LastLoginAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_orders_tables {
    use super::m20240101_000001_create_restaurants_and_drivers::Restaurants;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut orders = Table::create();
            orders
                .table(Orders::Table)
                .if_not_exists()
                .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Orders::RestaurantId).uuid().not_null())
                .col(ColumnDef::new(Orders::OrderNumber).string_len(32).not_null())
                .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                .col(ColumnDef::new(Orders::ServiceType).string_len(16).not_null())
                .col(ColumnDef::new(Orders::PaymentStatus).string_len(16).not_null())
                .col(ColumnDef::new(Orders::PaymentMethod).string_len(16).not_null())
                .col(ColumnDef::new(Orders::CustomerName).string().not_null())
                .col(ColumnDef::new(Orders::CustomerPhone).string().not_null())
                .col(ColumnDef::new(Orders::DeliveryAddress).text().null())
                .col(money(Orders::Subtotal))
                .col(money(Orders::DeliveryFee))
                .col(money(Orders::Discount))
                .col(money(Orders::Total))
                .col(ColumnDef::new(Orders::Notes).text().null())
                .col(ColumnDef::new(Orders::DriverId).uuid().null())
                .col(ColumnDef::new(Orders::CancellationReason).text().null());
            for stamp in [
                Orders::AcceptedAt,
                Orders::PreparingAt,
                Orders::ReadyAt,
                Orders::AssignedToDriverAt,
                Orders::PickedUpAt,
                Orders::DeliveredAt,
                Orders::CompletedAt,
                Orders::CancelledAt,
            ] {
                orders.col(ColumnDef::new(stamp).timestamp_with_time_zone().null());
            }
            orders
                .col(
                    ColumnDef::new(Orders::Version)
                        .integer()
                        .not_null()
                        .default(1),
                )
                .col(
                    ColumnDef::new(Orders::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(Orders::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(&mut cascade_fk(
                    "fk_orders_restaurant",
                    (Orders::Table, Orders::RestaurantId),
                    (Restaurants::Table, Restaurants::Id),
                ));
            manager.create_table(orders.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_orders_restaurant_order_number")
                        .table(Orders::Table)
                        .col(Orders::RestaurantId)
                        .col(Orders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_restaurant_status")
                        .table(Orders::Table)
                        .col(Orders::RestaurantId)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_driver_id")
                        .table(Orders::Table)
                        .col(Orders::DriverId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().null())
                        .col(ColumnDef::new(OrderItems::VariantId).uuid().null())
                        .col(ColumnDef::new(OrderItems::ComboId).uuid().null())
                        .col(ColumnDef::new(OrderItems::PromotionId).uuid().null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(money(OrderItems::UnitPrice))
                        .col(money(OrderItems::TotalPrice))
                        .col(ColumnDef::new(OrderItems::SelectedOptions).json().not_null())
                        .col(ColumnDef::new(OrderItems::Notes).text().null())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(&mut cascade_fk(
                            "fk_order_items_order",
                            (OrderItems::Table, OrderItems::OrderId),
                            (Orders::Table, Orders::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderStatusHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderStatusHistory::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderStatusHistory::FromStatus).string_len(32).null())
                        .col(ColumnDef::new(OrderStatusHistory::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(OrderStatusHistory::ChangedByType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderStatusHistory::ChangedById).uuid().null())
                        .col(ColumnDef::new(OrderStatusHistory::Notes).text().null())
                        .col(
                            ColumnDef::new(OrderStatusHistory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(&mut cascade_fk(
                            "fk_order_status_history_order",
                            (OrderStatusHistory::Table, OrderStatusHistory::OrderId),
                            (Orders::Table, Orders::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_status_history_order_id")
                        .table(OrderStatusHistory::Table)
                        .col(OrderStatusHistory::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum Orders {
        Table,
        Id,
        RestaurantId,
        OrderNumber,
        Status,
        ServiceType,
        PaymentStatus,
        PaymentMethod,
        CustomerName,
        CustomerPhone,
        DeliveryAddress,
        Subtotal,
        DeliveryFee,
        Discount,
        Total,
        Notes,
        DriverId,
        CancellationReason,
        AcceptedAt,
        PreparingAt,
        ReadyAt,
        AssignedToDriverAt,
        PickedUpAt,
        DeliveredAt,
        CompletedAt,
        CancelledAt,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        VariantId,
        ComboId,
        PromotionId,
        Name,
        Quantity,
        UnitPrice,
        TotalPrice,
        SelectedOptions,
        Notes,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderStatusHistory {
        Table,
        Id,
        OrderId,
        FromStatus,
        Status,
        ChangedByType,
        ChangedById,
        Notes,
        CreatedAt,
    }
}

mod m20240101_000003_create_menu_tables {
    use super::m20240101_000001_create_restaurants_and_drivers::Restaurants;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_menu_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Categories::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Categories::RestaurantId).uuid().not_null())
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Description).text().null())
                        .col(ColumnDef::new(Categories::ImageUrl).string().null())
                        .col(flag(Categories::IsActive, true))
                        .col(sort_order(Categories::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_categories_restaurant",
                            (Categories::Table, Categories::RestaurantId),
                            (Restaurants::Table, Restaurants::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Products::RestaurantId).uuid().not_null())
                        .col(ColumnDef::new(Products::CategoryId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(money(Products::Price))
                        .col(ColumnDef::new(Products::ImageUrl).string().null())
                        .col(flag(Products::IsActive, true))
                        .col(flag(Products::IsAvailable, true))
                        .col(sort_order(Products::SortOrder))
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(&mut cascade_fk(
                            "fk_products_category",
                            (Products::Table, Products::CategoryId),
                            (Categories::Table, Categories::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                        .col(money(ProductVariants::Price))
                        .col(flag(ProductVariants::IsActive, true))
                        .col(sort_order(ProductVariants::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_product_variants_product",
                            (ProductVariants::Table, ProductVariants::ProductId),
                            (Products::Table, Products::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sections::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sections::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Sections::RestaurantId).uuid().not_null())
                        .col(ColumnDef::new(Sections::Name).string().not_null())
                        .col(
                            ColumnDef::new(Sections::MinSelections)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Sections::MaxSelections)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(flag(Sections::IsActive, true))
                        .col(sort_order(Sections::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_sections_restaurant",
                            (Sections::Table, Sections::RestaurantId),
                            (Restaurants::Table, Restaurants::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SectionOptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SectionOptions::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SectionOptions::SectionId).uuid().not_null())
                        .col(ColumnDef::new(SectionOptions::Name).string().not_null())
                        .col(money(SectionOptions::PriceAdjustment))
                        .col(flag(SectionOptions::IsActive, true))
                        .col(sort_order(SectionOptions::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_section_options_section",
                            (SectionOptions::Table, SectionOptions::SectionId),
                            (Sections::Table, Sections::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductSections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductSections::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductSections::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductSections::SectionId).uuid().not_null())
                        .col(sort_order(ProductSections::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_product_sections_product",
                            (ProductSections::Table, ProductSections::ProductId),
                            (Products::Table, Products::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_product_sections_product_section")
                        .table(ProductSections::Table)
                        .col(ProductSections::ProductId)
                        .col(ProductSections::SectionId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Combos::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Combos::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Combos::RestaurantId).uuid().not_null())
                        .col(ColumnDef::new(Combos::Name).string().not_null())
                        .col(ColumnDef::new(Combos::Description).text().null())
                        .col(money(Combos::Price))
                        .col(ColumnDef::new(Combos::ImageUrl).string().null())
                        .col(flag(Combos::IsActive, true))
                        .col(sort_order(Combos::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_combos_restaurant",
                            (Combos::Table, Combos::RestaurantId),
                            (Restaurants::Table, Restaurants::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ComboItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ComboItems::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(ComboItems::ComboId).uuid().not_null())
                        .col(ColumnDef::new(ComboItems::ProductId).uuid().null())
                        .col(ColumnDef::new(ComboItems::VariantId).uuid().null())
                        .col(
                            ColumnDef::new(ComboItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(flag(ComboItems::IsChoiceGroup, false))
                        .col(ColumnDef::new(ComboItems::GroupName).string().null())
                        .col(sort_order(ComboItems::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_combo_items_combo",
                            (ComboItems::Table, ComboItems::ComboId),
                            (Combos::Table, Combos::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ComboItemOptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ComboItemOptions::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ComboItemOptions::ComboItemId).uuid().not_null())
                        .col(ColumnDef::new(ComboItemOptions::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ComboItemOptions::VariantId).uuid().null())
                        .col(money(ComboItemOptions::PriceAdjustment))
                        .col(sort_order(ComboItemOptions::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_combo_item_options_item",
                            (ComboItemOptions::Table, ComboItemOptions::ComboItemId),
                            (ComboItems::Table, ComboItems::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BadgeTypes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BadgeTypes::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(BadgeTypes::RestaurantId).uuid().not_null())
                        .col(ColumnDef::new(BadgeTypes::Name).string().not_null())
                        .col(ColumnDef::new(BadgeTypes::Color).string_len(32).null())
                        .col(ColumnDef::new(BadgeTypes::Icon).string_len(64).null())
                        .col(flag(BadgeTypes::IsActive, true))
                        .col(sort_order(BadgeTypes::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_badge_types_restaurant",
                            (BadgeTypes::Table, BadgeTypes::RestaurantId),
                            (Restaurants::Table, Restaurants::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductBadges::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ProductBadges::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(ProductBadges::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductBadges::BadgeTypeId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductBadges::StartsAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductBadges::EndsAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(&mut cascade_fk(
                            "fk_product_badges_product",
                            (ProductBadges::Table, ProductBadges::ProductId),
                            (Products::Table, Products::Id),
                        ))
                        .foreign_key(&mut cascade_fk(
                            "fk_product_badges_badge_type",
                            (ProductBadges::Table, ProductBadges::BadgeTypeId),
                            (BadgeTypes::Table, BadgeTypes::Id),
                        ))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                ProductBadges::Table.into_iden(),
                BadgeTypes::Table.into_iden(),
                ComboItemOptions::Table.into_iden(),
                ComboItems::Table.into_iden(),
                Combos::Table.into_iden(),
                ProductSections::Table.into_iden(),
                SectionOptions::Table.into_iden(),
                Sections::Table.into_iden(),
                ProductVariants::Table.into_iden(),
                Products::Table.into_iden(),
                Categories::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Categories {
        Table,
        Id,
        RestaurantId,
        Name,
        Description,
        ImageUrl,
        IsActive,
        SortOrder,
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        RestaurantId,
        CategoryId,
        Name,
        Description,
        Price,
        ImageUrl,
        IsActive,
        IsAvailable,
        SortOrder,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductVariants {
        Table,
        Id,
        ProductId,
        Name,
        Price,
        IsActive,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum Sections {
        Table,
        Id,
        RestaurantId,
        Name,
        MinSelections,
        MaxSelections,
        IsActive,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum SectionOptions {
        Table,
        Id,
        SectionId,
        Name,
        PriceAdjustment,
        IsActive,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum ProductSections {
        Table,
        Id,
        ProductId,
        SectionId,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum Combos {
        Table,
        Id,
        RestaurantId,
        Name,
        Description,
        Price,
        ImageUrl,
        IsActive,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum ComboItems {
        Table,
        Id,
        ComboId,
        ProductId,
        VariantId,
        Quantity,
        IsChoiceGroup,
        GroupName,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum ComboItemOptions {
        Table,
        Id,
        ComboItemId,
        ProductId,
        VariantId,
        PriceAdjustment,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum BadgeTypes {
        Table,
        Id,
        RestaurantId,
        Name,
        Color,
        Icon,
        IsActive,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum ProductBadges {
        Table,
        Id,
        ProductId,
        BadgeTypeId,
        StartsAt,
        EndsAt,
    }
}

mod m20240101_000004_create_promotion_tables {
    use super::m20240101_000001_create_restaurants_and_drivers::Restaurants;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_promotion_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Promotions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Promotions::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Promotions::RestaurantId).uuid().not_null())
                        .col(ColumnDef::new(Promotions::Name).string().not_null())
                        .col(ColumnDef::new(Promotions::Description).text().null())
                        .col(ColumnDef::new(Promotions::PromotionType).string_len(32).not_null())
                        .col(ColumnDef::new(Promotions::DiscountType).string_len(32).not_null())
                        .col(money(Promotions::DiscountValue))
                        .col(ColumnDef::new(Promotions::ValidityType).string_len(32).not_null())
                        .col(ColumnDef::new(Promotions::ValidFrom).date().null())
                        .col(ColumnDef::new(Promotions::ValidUntil).date().null())
                        .col(ColumnDef::new(Promotions::TimeFrom).time().null())
                        .col(ColumnDef::new(Promotions::TimeUntil).time().null())
                        .col(ColumnDef::new(Promotions::Weekdays).json().null())
                        .col(ColumnDef::new(Promotions::BadgeTypeId).uuid().null())
                        .col(flag(Promotions::IsActive, true))
                        .col(sort_order(Promotions::SortOrder))
                        .col(
                            ColumnDef::new(Promotions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Promotions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(&mut cascade_fk(
                            "fk_promotions_restaurant",
                            (Promotions::Table, Promotions::RestaurantId),
                            (Restaurants::Table, Restaurants::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PromotionItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PromotionItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PromotionItems::PromotionId).uuid().not_null())
                        .col(ColumnDef::new(PromotionItems::ProductId).uuid().null())
                        .col(ColumnDef::new(PromotionItems::CategoryId).uuid().null())
                        .col(ColumnDef::new(PromotionItems::ComboId).uuid().null())
                        .col(
                            ColumnDef::new(PromotionItems::SpecialPrice)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(sort_order(PromotionItems::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_promotion_items_promotion",
                            (PromotionItems::Table, PromotionItems::PromotionId),
                            (Promotions::Table, Promotions::Id),
                        ))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BundlePromotionItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BundlePromotionItems::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(BundlePromotionItems::PromotionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BundlePromotionItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(BundlePromotionItems::VariantId).uuid().null())
                        .col(
                            ColumnDef::new(BundlePromotionItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(sort_order(BundlePromotionItems::SortOrder))
                        .foreign_key(&mut cascade_fk(
                            "fk_bundle_promotion_items_promotion",
                            (BundlePromotionItems::Table, BundlePromotionItems::PromotionId),
                            (Promotions::Table, Promotions::Id),
                        ))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BundlePromotionItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PromotionItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Promotions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Promotions {
        Table,
        Id,
        RestaurantId,
        Name,
        Description,
        PromotionType,
        DiscountType,
        DiscountValue,
        ValidityType,
        ValidFrom,
        ValidUntil,
        TimeFrom,
        TimeUntil,
        Weekdays,
        BadgeTypeId,
        IsActive,
        SortOrder,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PromotionItems {
        Table,
        Id,
        PromotionId,
        ProductId,
        CategoryId,
        ComboId,
        SpecialPrice,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum BundlePromotionItems {
        Table,
        Id,
        PromotionId,
        ProductId,
        VariantId,
        Quantity,
        SortOrder,
    }
}

mod m20240101_000005_create_outbox_events_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_outbox_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OutboxEvents::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OutboxEvents::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(OutboxEvents::AggregateType).string_len(64).not_null())
                        .col(ColumnDef::new(OutboxEvents::AggregateId).uuid().not_null())
                        .col(ColumnDef::new(OutboxEvents::EventType).string_len(64).not_null())
                        .col(ColumnDef::new(OutboxEvents::Payload).json().not_null())
                        .col(
                            ColumnDef::new(OutboxEvents::Status)
                                .string_len(16)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(OutboxEvents::Attempts)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(OutboxEvents::LastError).text().null())
                        .col(
                            ColumnDef::new(OutboxEvents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OutboxEvents::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_outbox_events_status_created_at")
                        .table(OutboxEvents::Table)
                        .col(OutboxEvents::Status)
                        .col(OutboxEvents::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OutboxEvents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OutboxEvents {
        Table,
        Id,
        AggregateType,
        AggregateId,
        EventType,
        Payload,
        Status,
        Attempts,
        LastError,
        CreatedAt,
        UpdatedAt,
    }
}
