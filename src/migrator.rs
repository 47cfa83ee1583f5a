use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_reference_tables::Migration),
            Box::new(m20250101_000002_create_catalog_tables::Migration),
            Box::new(m20250101_000003_create_order_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_reference_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(ColumnDef::new(Customers::Category).string_len(32).null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentMethods::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentMethods::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentMethods::Name).string().not_null())
                        .col(
                            ColumnDef::new(PaymentMethods::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DeliveryPlaces::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryPlaces::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryPlaces::Name).string().not_null())
                        .col(ColumnDef::new(DeliveryPlaces::Address).string().null())
                        .col(
                            ColumnDef::new(DeliveryPlaces::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SalesChannels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SalesChannels::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SalesChannels::Name).string().not_null())
                        .col(
                            ColumnDef::new(SalesChannels::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SalesChannels::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DeliveryPlaces::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Customers {
        Table,
        Id,
        Name,
        Phone,
        Category,
        CreatedAt,
    }

    #[derive(Iden)]
    pub enum PaymentMethods {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(Iden)]
    pub enum DeliveryPlaces {
        Table,
        Id,
        Name,
        Address,
        CreatedAt,
    }

    #[derive(Iden)]
    pub enum SalesChannels {
        Table,
        Id,
        Name,
        CreatedAt,
    }
}

mod m20250101_000002_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
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
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductVariants::Sku).string().not_null())
                        // NULL stock means untracked
                        .col(ColumnDef::new(ProductVariants::Stock).integer().null())
                        .col(
                            ColumnDef::new(ProductVariants::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .check(Expr::col(ProductVariants::Stock).gte(0))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_variants_product_id")
                                .from(ProductVariants::Table, ProductVariants::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_variants_product_id")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductPrices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductPrices::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductPrices::ProductVariantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductPrices::Normal).decimal().null())
                        .col(ColumnDef::new(ProductPrices::Member).decimal().null())
                        .col(
                            ColumnDef::new(ProductPrices::Reseller)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductPrices::Agent).decimal().null())
                        .col(ColumnDef::new(ProductPrices::Buy).decimal().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_prices_variant_id")
                                .from(ProductPrices::Table, ProductPrices::ProductVariantId)
                                .to(ProductVariants::Table, ProductVariants::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_prices_variant_id")
                        .table(ProductPrices::Table)
                        .col(ProductPrices::ProductVariantId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductPrices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Products {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(Iden)]
    pub enum ProductVariants {
        Table,
        Id,
        ProductId,
        Sku,
        Stock,
        Position,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum ProductPrices {
        Table,
        Id,
        ProductVariantId,
        Normal,
        Member,
        Reseller,
        Agent,
        Buy,
    }
}

mod m20250101_000003_create_order_tables {

    use super::m20250101_000001_create_reference_tables::{Customers, PaymentMethods};
    use super::m20250101_000002_create_catalog_tables::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrdererCustomerId).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::DeliveryTargetCustomerId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::DeliveryPlaceId).uuid().null())
                        .col(ColumnDef::new(Orders::SalesChannelId).uuid().null())
                        .col(
                            ColumnDef::new(Orders::OrderDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Note).text().null())
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
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_orderer_customer_id")
                                .from(Orders::Table, Orders::OrdererCustomerId)
                                .to(Customers::Table, Customers::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_delivery_target_customer_id")
                                .from(Orders::Table, Orders::DeliveryTargetCustomerId)
                                .to(Customers::Table, Customers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderDetails::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderDetails::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderDetails::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderDetails::Code).string().not_null())
                        .col(
                            ColumnDef::new(OrderDetails::OriginalFinalPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderDetails::FinalPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(OrderDetails::OtherFees).json().null())
                        .col(ColumnDef::new(OrderDetails::PaymentMethodId).uuid().null())
                        .col(
                            ColumnDef::new(OrderDetails::PaymentStatus)
                                .string_len(32)
                                .not_null()
                                .default("PENDING"),
                        )
                        .col(
                            ColumnDef::new(OrderDetails::PaymentDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(OrderDetails::ReceiptNumber).string().null())
                        .col(
                            ColumnDef::new(OrderDetails::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderDetails::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_details_order_id")
                                .from(OrderDetails::Table, OrderDetails::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_details_payment_method_id")
                                .from(OrderDetails::Table, OrderDetails::PaymentMethodId)
                                .to(PaymentMethods::Table, PaymentMethods::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // Code uniqueness is enforced by the store, not only by the pre-check.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_order_details_code")
                        .table(OrderDetails::Table)
                        .col(OrderDetails::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_order_details_order_id")
                        .table(OrderDetails::Table)
                        .col(OrderDetails::OrderId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderProducts::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderProducts::OrderDetailId).uuid().not_null())
                        .col(ColumnDef::new(OrderProducts::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderProducts::ProductVariantId).uuid().null())
                        .col(ColumnDef::new(OrderProducts::ProductQty).integer().not_null())
                        .col(
                            ColumnDef::new(OrderProducts::ProductPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .check(Expr::col(OrderProducts::ProductQty).gt(0))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_products_order_id")
                                .from(OrderProducts::Table, OrderProducts::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_products_order_detail_id")
                                .from(OrderProducts::Table, OrderProducts::OrderDetailId)
                                .to(OrderDetails::Table, OrderDetails::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_products_product_id")
                                .from(OrderProducts::Table, OrderProducts::ProductId)
                                .to(Products::Table, Products::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_products_order_id")
                        .table(OrderProducts::Table)
                        .col(OrderProducts::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Installments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Installments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Installments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Installments::PaymentMethodId).uuid().not_null())
                        .col(
                            ColumnDef::new(Installments::PaymentDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Installments::Amount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Installments::IsPaid)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Installments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_installments_order_id")
                                .from(Installments::Table, Installments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShippingServices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShippingServices::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShippingServices::OrderId).uuid().not_null())
                        .col(ColumnDef::new(ShippingServices::ShippingName).string().not_null())
                        .col(ColumnDef::new(ShippingServices::ServiceName).string().not_null())
                        .col(ColumnDef::new(ShippingServices::Weight).decimal().null())
                        .col(
                            ColumnDef::new(ShippingServices::IsCod)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ShippingServices::ShippingCost)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ShippingServices::ShippingCashback)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ShippingServices::ShippingCostNet)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ShippingServices::Grandtotal)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ShippingServices::ServiceFee)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ShippingServices::NetIncome)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(ShippingServices::Etd).string().null())
                        .col(ColumnDef::new(ShippingServices::Type).string().null())
                        .col(
                            ColumnDef::new(ShippingServices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shipping_services_order_id")
                                .from(ShippingServices::Table, ShippingServices::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShippingServices::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Installments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderDetails::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        OrdererCustomerId,
        DeliveryTargetCustomerId,
        DeliveryPlaceId,
        SalesChannelId,
        OrderDate,
        Note,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum OrderDetails {
        Table,
        Id,
        OrderId,
        Code,
        OriginalFinalPrice,
        FinalPrice,
        OtherFees,
        PaymentMethodId,
        PaymentStatus,
        PaymentDate,
        ReceiptNumber,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum OrderProducts {
        Table,
        Id,
        OrderId,
        OrderDetailId,
        ProductId,
        ProductVariantId,
        ProductQty,
        ProductPrice,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Installments {
        Table,
        Id,
        OrderId,
        PaymentMethodId,
        PaymentDate,
        Amount,
        IsPaid,
        CreatedAt,
    }

    #[derive(Iden)]
    enum ShippingServices {
        Table,
        Id,
        OrderId,
        ShippingName,
        ServiceName,
        Weight,
        IsCod,
        ShippingCost,
        ShippingCashback,
        ShippingCostNet,
        Grandtotal,
        ServiceFee,
        NetIncome,
        Etd,
        Type,
        CreatedAt,
    }
}
