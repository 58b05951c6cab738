use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_feed_tables::Migration),
            Box::new(m20240101_000003_create_tracking_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
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
                        .col(ColumnDef::new(Products::Slug).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Brand).string().null())
                        .col(ColumnDef::new(Products::Sku).string().null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Currency).string().not_null())
                        .col(
                            ColumnDef::new(Products::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Tags).string().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_is_active_created_at")
                        .table(Products::Table)
                        .col(Products::IsActive)
                        .col(Products::CreatedAt)
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
                        .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                        .col(ColumnDef::new(ProductVariants::Sku).string().null())
                        .col(ColumnDef::new(ProductVariants::Price).decimal_len(16, 4).null())
                        .col(ColumnDef::new(ProductVariants::Description).text().null())
                        .col(ColumnDef::new(ProductVariants::Quantity).integer().null())
                        .col(
                            ColumnDef::new(ProductVariants::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::UpdatedAt)
                                .timestamp()
                                .not_null(),
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
                        .table(ProductImages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductImages::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductImages::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductImages::Url).string().not_null())
                        .col(ColumnDef::new(ProductImages::AltText).string().null())
                        .col(
                            ColumnDef::new(ProductImages::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_images_product_id")
                        .table(ProductImages::Table)
                        .col(ProductImages::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Slug).string().not_null())
                        .col(
                            ColumnDef::new(Categories::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Categories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductCategories::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductCategories::CategoryId)
                                .uuid()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(ProductCategories::ProductId)
                                .col(ProductCategories::CategoryId),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductCategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductImages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Slug,
        Description,
        Brand,
        Sku,
        Price,
        Currency,
        Quantity,
        Tags,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductVariants {
        Table,
        Id,
        ProductId,
        Name,
        Sku,
        Price,
        Description,
        Quantity,
        Position,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductImages {
        Table,
        Id,
        ProductId,
        Url,
        AltText,
        SortOrder,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
        Slug,
        SortOrder,
        IsActive,
    }

    #[derive(DeriveIden)]
    enum ProductCategories {
        Table,
        ProductId,
        CategoryId,
    }
}

mod m20240101_000002_create_feed_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_feed_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FeedConfigs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FeedConfigs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FeedConfigs::Name).string().not_null())
                        .col(
                            ColumnDef::new(FeedConfigs::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(FeedConfigs::Platform).string().not_null())
                        .col(ColumnDef::new(FeedConfigs::Format).string().not_null())
                        .col(
                            ColumnDef::new(FeedConfigs::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(FeedConfigs::CategoryFilter)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FeedConfigs::IncludeVariants)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(FeedConfigs::CacheDurationSecs)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(FeedConfigs::LastGeneratedAt)
                                .timestamp()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(FeedConfigs::GenerationCount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(FeedConfigs::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(FeedConfigs::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FeedGenerationRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FeedGenerationRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FeedGenerationRecords::FeedId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FeedGenerationRecords::Status)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FeedGenerationRecords::ProductCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(FeedGenerationRecords::ValidationErrors)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FeedGenerationRecords::GenerationTimeMs)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(FeedGenerationRecords::FileSizeBytes)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(FeedGenerationRecords::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_feed_generation_records_feed_id")
                        .table(FeedGenerationRecords::Table)
                        .col(FeedGenerationRecords::FeedId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FeedGenerationRecords::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(FeedConfigs::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum FeedConfigs {
        Table,
        Id,
        Name,
        Slug,
        Platform,
        Format,
        IsActive,
        CategoryFilter,
        IncludeVariants,
        CacheDurationSecs,
        LastGeneratedAt,
        GenerationCount,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum FeedGenerationRecords {
        Table,
        Id,
        FeedId,
        Status,
        ProductCount,
        ValidationErrors,
        GenerationTimeMs,
        FileSizeBytes,
        CreatedAt,
    }
}

mod m20240101_000003_create_tracking_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_tracking_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PixelPlatforms::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PixelPlatforms::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PixelPlatforms::Name).string().not_null())
                        .col(ColumnDef::new(PixelPlatforms::Platform).string().not_null())
                        .col(ColumnDef::new(PixelPlatforms::PixelId).string().not_null())
                        .col(
                            ColumnDef::new(PixelPlatforms::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(PixelPlatforms::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PixelPlatforms::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TrackedEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TrackedEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TrackedEvents::PixelPlatformId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TrackedEvents::EventType).string().not_null())
                        .col(ColumnDef::new(TrackedEvents::Value).decimal_len(16, 4).null())
                        .col(ColumnDef::new(TrackedEvents::Currency).string().not_null())
                        .col(ColumnDef::new(TrackedEvents::ProductId).string().null())
                        .col(ColumnDef::new(TrackedEvents::OrderId).string().null())
                        .col(ColumnDef::new(TrackedEvents::UserId).string().null())
                        .col(ColumnDef::new(TrackedEvents::SessionId).string().null())
                        .col(ColumnDef::new(TrackedEvents::Metadata).json().not_null())
                        .col(
                            ColumnDef::new(TrackedEvents::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tracked_events_platform_created_at")
                        .table(TrackedEvents::Table)
                        .col(TrackedEvents::PixelPlatformId)
                        .col(TrackedEvents::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tracked_events_event_type")
                        .table(TrackedEvents::Table)
                        .col(TrackedEvents::EventType)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TrackedEvents::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PixelPlatforms::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum PixelPlatforms {
        Table,
        Id,
        Name,
        Platform,
        PixelId,
        IsEnabled,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum TrackedEvents {
        Table,
        Id,
        PixelPlatformId,
        EventType,
        Value,
        Currency,
        ProductId,
        OrderId,
        UserId,
        SessionId,
        Metadata,
        CreatedAt,
    }
}
