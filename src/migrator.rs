use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_reference_tables::Migration),
            Box::new(m20260101_000002_create_load_tables::Migration),
            Box::new(m20260101_000003_create_sap_inventory_table::Migration),
        ]
    }
}

mod m20260101_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::CustomerLot)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::SalesOrderNumber).string().null())
                        .col(
                            ColumnDef::new(PurchaseOrders::PricePerThousand)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(PurchaseOrders::PiecesPerPallet).big_integer().null())
                        .col(ColumnDef::new(PurchaseOrders::PiezasPorPaquete).big_integer().null())
                        .col(ColumnDef::new(PurchaseOrders::CustomerItemCode).string().null())
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Destinations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Destinations::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Destinations::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Destinations::Address).text().not_null())
                        .col(ColumnDef::new(Destinations::ClientCode).string().not_null())
                        .col(ColumnDef::new(Destinations::ClientName).string().not_null())
                        .col(ColumnDef::new(Destinations::SalesPerson).string().null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Destinations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        CustomerLot,
        SalesOrderNumber,
        PricePerThousand,
        PiecesPerPallet,
        PiezasPorPaquete,
        CustomerItemCode,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Destinations {
        Table,
        Id,
        Name,
        Address,
        ClientCode,
        ClientName,
        SalesPerson,
    }
}

mod m20260101_000002_create_load_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000002_create_load_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Loads::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Loads::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Loads::LoadNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Loads::InvoiceNumber).string().null())
                        .col(ColumnDef::new(Loads::Status).string().not_null())
                        .col(
                            ColumnDef::new(Loads::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Loads::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Pallets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Pallets::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Pallets::PtCode).string().not_null())
                        .col(ColumnDef::new(Pallets::Description).string().not_null())
                        .col(ColumnDef::new(Pallets::Quantity).big_integer().not_null())
                        .col(ColumnDef::new(Pallets::GrossWeight).decimal_len(16, 4).null())
                        .col(ColumnDef::new(Pallets::NetWeight).decimal_len(16, 4).null())
                        .col(ColumnDef::new(Pallets::Unit).string().not_null())
                        .col(ColumnDef::new(Pallets::CustomerLot).string().null())
                        .col(ColumnDef::new(Pallets::BfxOrder).string().null())
                        .col(ColumnDef::new(Pallets::Traceability).string().null())
                        .col(ColumnDef::new(Pallets::Status).string().not_null())
                        .col(ColumnDef::new(Pallets::Source).string().not_null())
                        .col(
                            ColumnDef::new(Pallets::IsVirtual)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Pallets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Pallets::UpdatedAt)
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
                        .name("idx_pallets_pt_code_customer_lot")
                        .table(Pallets::Table)
                        .col(Pallets::PtCode)
                        .col(Pallets::CustomerLot)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LoadPallets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(LoadPallets::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(LoadPallets::LoadId).uuid().not_null())
                        .col(ColumnDef::new(LoadPallets::PalletId).uuid().not_null())
                        .col(ColumnDef::new(LoadPallets::Quantity).big_integer().not_null())
                        .col(ColumnDef::new(LoadPallets::Destination).string().null())
                        .col(ColumnDef::new(LoadPallets::ReleaseNumber).string().null())
                        .col(ColumnDef::new(LoadPallets::ReleasePdfUrl).string().null())
                        .col(
                            ColumnDef::new(LoadPallets::IsOnHold)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(LoadPallets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LoadPallets::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_load_pallets_load")
                                .from(LoadPallets::Table, LoadPallets::LoadId)
                                .to(Loads::Table, Loads::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_load_pallets_load_id")
                        .table(LoadPallets::Table)
                        .col(LoadPallets::LoadId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_load_pallets_pallet_id")
                        .table(LoadPallets::Table)
                        .col(LoadPallets::PalletId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(LoadPallets::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Pallets::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Loads::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Loads {
        Table,
        Id,
        LoadNumber,
        InvoiceNumber,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Pallets {
        Table,
        Id,
        PtCode,
        Description,
        Quantity,
        GrossWeight,
        NetWeight,
        Unit,
        CustomerLot,
        BfxOrder,
        Traceability,
        Status,
        Source,
        IsVirtual,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum LoadPallets {
        Table,
        Id,
        LoadId,
        PalletId,
        Quantity,
        Destination,
        ReleaseNumber,
        ReleasePdfUrl,
        IsOnHold,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20260101_000003_create_sap_inventory_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20260101_000003_create_sap_inventory_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SapInventory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SapInventory::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SapInventory::PtCode).string().not_null())
                        .col(ColumnDef::new(SapInventory::Description).string().not_null())
                        .col(ColumnDef::new(SapInventory::Stock).decimal_len(16, 4).not_null())
                        .col(ColumnDef::new(SapInventory::Unit).string().not_null())
                        .col(ColumnDef::new(SapInventory::GrossWeight).decimal_len(16, 4).null())
                        .col(ColumnDef::new(SapInventory::NetWeight).decimal_len(16, 4).null())
                        .col(ColumnDef::new(SapInventory::Traceability).string().null())
                        .col(ColumnDef::new(SapInventory::CustomerLot).string().null())
                        .col(
                            ColumnDef::new(SapInventory::Boxes)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(SapInventory::AssignedDelivery).string().null())
                        .col(ColumnDef::new(SapInventory::Status).string().not_null())
                        .col(ColumnDef::new(SapInventory::ProductionDate).date().not_null())
                        .col(
                            ColumnDef::new(SapInventory::SyncedAt)
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
                        .name("idx_sap_inventory_synced_at")
                        .table(SapInventory::Table)
                        .col(SapInventory::SyncedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SapInventory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SapInventory {
        Table,
        Id,
        PtCode,
        Description,
        Stock,
        Unit,
        GrossWeight,
        NetWeight,
        Traceability,
        CustomerLot,
        Boxes,
        AssignedDelivery,
        Status,
        ProductionDate,
        SyncedAt,
    }
}
