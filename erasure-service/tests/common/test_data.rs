// tests/common/test_data.rs

use erasure_service::domain::subject::SubjectType;
use erasure_service::repository::in_memory_marketplace_records::InMemoryMarketplaceRecords;
use serde_json::json;
use uuid::Uuid;

/// 借り手・貸し手・代理店・管理者それぞれ一人ずつのデータ
pub struct SeededMarketplace {
    pub renter_id: Uuid,
    pub other_renter_id: Uuid,
    pub landlord_id: Uuid,
    pub agency_id: Uuid,
    pub admin_id: Uuid,
    pub property_id: Uuid,
}

fn id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn seed_subject(
    records: &InMemoryMarketplaceRecords,
    subject_type: SubjectType,
) -> Uuid {
    let subject_id = Uuid::new_v4();
    records
        .add_subject(
            subject_type,
            subject_id,
            &format!("{}@example.com", subject_id.simple()),
        )
        .await;
    subject_id
}

pub async fn seed_marketplace(records: &InMemoryMarketplaceRecords) -> SeededMarketplace {
    let renter_id = seed_subject(records, SubjectType::Renter).await;
    let other_renter_id = seed_subject(records, SubjectType::Renter).await;
    let landlord_id = seed_subject(records, SubjectType::Landlord).await;
    let agency_id = seed_subject(records, SubjectType::Agency).await;
    let admin_id = seed_subject(records, SubjectType::Admin).await;

    let renter = renter_id.to_string();
    let other = other_renter_id.to_string();
    let landlord = landlord_id.to_string();
    let agency = agency_id.to_string();

    let property_id = Uuid::new_v4();
    let property = property_id.to_string();
    records
        .insert_row(
            "properties",
            json!({
                "id": property, "landlord_id": landlord, "agency_id": agency,
                "agency_contact": "Sato Realty, 03-1234-5678",
                "title": "2LDK near the station", "monthly_rent": 180000
            }),
        )
        .await;

    for renter_ref in [&renter, &other] {
        let match_id = id();
        let conversation_id = id();
        records
            .insert_row(
                "matches",
                json!({"id": match_id, "property_id": property, "renter_id": renter_ref, "landlord_id": landlord, "score": 0.87}),
            )
            .await;
        records
            .insert_row(
                "conversations",
                json!({"id": conversation_id, "match_id": match_id, "renter_id": renter_ref, "landlord_id": landlord}),
            )
            .await;
        for body in ["Is the flat still available?", "Yes, when can you view it?"] {
            records
                .insert_row(
                    "messages",
                    json!({"id": id(), "conversation_id": conversation_id, "sender_id": renter_ref, "body": body}),
                )
                .await;
        }
        records
            .insert_row(
                "viewing_requests",
                json!({"id": id(), "property_id": property, "renter_id": renter_ref, "landlord_id": landlord}),
            )
            .await;
        records
            .insert_row(
                "rental_applications",
                json!({"id": id(), "property_id": property, "renter_id": renter_ref, "income_statement": "salary 6M JPY"}),
            )
            .await;
        records
            .insert_row(
                "saved_searches",
                json!({"id": id(), "renter_id": renter_ref, "criteria": {"max_rent": 200000}}),
            )
            .await;
        records
            .insert_row(
                "ratings",
                json!({"id": id(), "rater_id": renter_ref, "ratee_id": landlord, "stars": 4, "comment": "Responsive landlord"}),
            )
            .await;
    }

    records
        .insert_row(
            "invoices",
            json!({
                "id": id(), "landlord_id": landlord, "agency_id": agency,
                "billing_name": "Yamada Taro", "billing_address": "1-2-3 Shibuya, Tokyo",
                "amount_cents": 1980000
            }),
        )
        .await;
    records
        .insert_row(
            "agency_agents",
            json!({"id": id(), "agency_id": agency, "full_name": "Suzuki Hanako", "phone": "090-0000-0000"}),
        )
        .await;
    records
        .insert_row(
            "admin_notes",
            json!({"id": id(), "author_id": admin_id.to_string(), "body": "Verified landlord identity documents"}),
        )
        .await;

    SeededMarketplace {
        renter_id,
        other_renter_id,
        landlord_id,
        agency_id,
        admin_id,
        property_id,
    }
}

/// 指定カラムが subject を参照している行の数
pub async fn rows_referencing(
    records: &InMemoryMarketplaceRecords,
    collection: &str,
    column: &str,
    subject_id: Uuid,
) -> usize {
    let subject = subject_id.to_string();
    records
        .rows(collection)
        .await
        .iter()
        .filter(|row| row[column] == subject.as_str())
        .count()
}
