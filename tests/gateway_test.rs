//! End-to-end tests of the gateway over an in-memory index.

use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use wt_read_api::{
    lookup, Gateway, GatewayConfig, GatewayError, ListQuery, MemoryIndex, OfflineFetcher,
    SchemaCache, HOTELS,
};

const SWAGGER: &str = r#"
openapi: 3.0.0
components:
  schemas:
    HotelDetail:
      allOf:
        - $ref: '#/components/schemas/HotelDescription'
        - type: object
          required:
            - id
          properties:
            id:
              type: string
            managerAddress:
              type: string
    HotelDescription:
      type: object
      required:
        - name
        - location
        - roomTypes
      properties:
        name:
          type: string
        location:
          $ref: '#/components/schemas/Location'
        roomTypes:
          type: array
          items:
            $ref: '#/components/schemas/RoomType'
    Location:
      type: object
      required:
        - latitude
        - longitude
      properties:
        latitude:
          type: number
        longitude:
          type: number
    RoomType:
      type: object
      required:
        - id
        - name
        - totalQuantity
      properties:
        id:
          type: string
        name:
          type: string
        totalQuantity:
          type: integer
"#;

fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

fn good_hotel(address: &str) -> Value {
    json!({
        "address": address,
        "onChain": { "manager": "0xmanager" },
        "dataUri": { "ref": format!("in-memory://{address}"), "contents": {
            "dataFormatVersion": "0.2.0",
            "descriptionUri": { "ref": "in-memory://description", "contents": {
                "name": format!("Hotel {address}"),
                "location": { "latitude": 50.08, "longitude": 14.42 },
                "roomTypes": [
                    { "id": "rt-1", "name": "Single", "totalQuantity": 3 },
                    { "id": "rt-2", "name": "Double", "totalQuantity": 2 },
                    { "id": "rt-3", "name": "Suite", "totalQuantity": 1 }
                ]
            } }
        } }
    })
}

fn broken_hotel(address: &str) -> Value {
    json!({ "address": address, "offChainError": "storage unreachable" })
}

fn index(hotels: Vec<Value>) -> MemoryIndex {
    MemoryIndex::parse(&json!({ "hotels": hotels }).to_string()).unwrap()
}

struct Fixture {
    _dir: TempDir,
    config: GatewayConfig,
    cache: SchemaCache,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let schema_path = write_temp_file(&dir, "swagger.yaml", SWAGGER);
        Self {
            _dir: dir,
            config: GatewayConfig {
                schema_path,
                ..GatewayConfig::default()
            },
            cache: SchemaCache::new(),
        }
    }

    fn gateway(&self) -> Gateway<'_> {
        Gateway::new(self.config.clone())
            .unwrap()
            .with_cache(&self.cache)
            .with_fetcher(OfflineFetcher)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

mod backfill {
    use super::*;

    #[tokio::test]
    async fn broken_items_are_replaced_from_further_ahead() {
        let fixture = Fixture::new();
        let hotels = vec![
            broken_hotel("0xbad1"),
            broken_hotel("0xbad2"),
            good_hotel("0x1"),
            good_hotel("0x2"),
            good_hotel("0x3"),
            good_hotel("0x4"),
            good_hotel("0x5"),
        ];
        let index = index(hotels);

        let fields = strings(&["name"]);
        let query = ListQuery {
            fields: &fields,
            limit: Some("4"),
            start_with: None,
        };
        let page = fixture
            .gateway()
            .list(&HOTELS, index.collection("hotels"), query)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 4);
        assert_eq!(page.errors.len(), 2);
        assert_eq!(page.errors[0].error, "Cannot access off-chain data");
        assert_eq!(page.errors[1].data, json!({ "id": "0xbad2" }));
        assert_eq!(page.warnings, Some(vec![]));
        assert_eq!(
            page.next.as_deref(),
            Some("http://localhost:3000/hotels?limit=4&fields=name&startWith=0x5")
        );
    }

    #[tokio::test]
    async fn collection_of_broken_items_is_exhausted() {
        let fixture = Fixture::new();
        let index = index((0..6).map(|i| broken_hotel(&format!("0xbad{i}"))).collect());

        let query = ListQuery {
            limit: Some("2"),
            ..ListQuery::default()
        };
        let page = fixture
            .gateway()
            .list(&HOTELS, index.collection("hotels"), query)
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.errors.len(), 6);
        assert_eq!(page.next, None);
    }

    #[tokio::test]
    async fn next_links_visit_every_hotel_once() {
        let fixture = Fixture::new();
        let index = index((0..7).map(|i| good_hotel(&format!("0x{i}"))).collect());
        let gateway = fixture.gateway();

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let query = ListQuery {
                limit: Some("3"),
                start_with: cursor.as_deref(),
                ..ListQuery::default()
            };
            let page = gateway
                .list(&HOTELS, index.collection("hotels"), query)
                .await
                .unwrap();
            seen.extend(page.items.iter().map(|item| item["id"].clone()));
            match page.next {
                Some(next) => {
                    cursor = next.split("startWith=").nth(1).map(str::to_string);
                }
                None => break,
            }
        }
        let expected: Vec<Value> = (0..7).map(|i| json!(format!("0x{i}"))).collect();
        assert_eq!(seen, expected);
    }
}

mod pagination {
    use super::*;

    #[tokio::test]
    async fn limit_above_maximum_is_clamped() {
        let mut fixture = Fixture::new();
        fixture.config.max_page_size = 2;
        fixture.config.default_page_size = 2;
        let index = index((0..5).map(|i| good_hotel(&format!("0x{i}"))).collect());

        let query = ListQuery {
            limit: Some("1000"),
            ..ListQuery::default()
        };
        let page = fixture
            .gateway()
            .list(&HOTELS, index.collection("hotels"), query)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next.unwrap().contains("limit=2&"));
    }

    #[tokio::test]
    async fn invalid_limit_and_cursor() {
        let fixture = Fixture::new();
        let index = index(vec![good_hotel("0x1")]);
        let gateway = fixture.gateway();

        let query = ListQuery {
            limit: Some("-500"),
            ..ListQuery::default()
        };
        let err = gateway
            .list(&HOTELS, index.collection("hotels"), query)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "#paginationLimitError");

        let query = ListQuery {
            start_with: Some("random-hotel-address"),
            ..ListQuery::default()
        };
        let err = gateway
            .list(&HOTELS, index.collection("hotels"), query)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.code(), "#paginationStartWithError");
    }
}

mod fields {
    use super::*;

    #[tokio::test]
    async fn nested_room_type_names() {
        let fixture = Fixture::new();
        let index = index(vec![good_hotel("0x1")]);

        let fields = strings(&["roomTypes.name"]);
        let query = ListQuery {
            fields: &fields,
            ..ListQuery::default()
        };
        let page = fixture
            .gateway()
            .list(&HOTELS, index.collection("hotels"), query)
            .await
            .unwrap();

        assert!(page.errors.is_empty());
        assert_eq!(
            page.items[0]["roomTypes"],
            json!([
                { "id": "rt-1", "name": "Single" },
                { "id": "rt-2", "name": "Double" },
                { "id": "rt-3", "name": "Suite" }
            ])
        );
    }

    #[tokio::test]
    async fn default_list_fields() {
        let fixture = Fixture::new();
        let index = index(vec![good_hotel("0x1")]);

        let page = fixture
            .gateway()
            .list(&HOTELS, index.collection("hotels"), ListQuery::default())
            .await
            .unwrap();

        let item = page.items[0].as_object().unwrap();
        let mut keys: Vec<_> = item.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["dataFormatVersion", "id", "location", "name"]);
    }

    #[tokio::test]
    async fn on_chain_field_is_renamed() {
        let fixture = Fixture::new();
        let index = index(vec![good_hotel("0x1")]);
        let hotel = lookup(&HOTELS, index.collection("hotels"), "0x1").unwrap();

        let detail = fixture
            .gateway()
            .find(&HOTELS, hotel, &strings(&["managerAddress,name"]))
            .await
            .unwrap();
        assert_eq!(detail.item["managerAddress"], "0xmanager");
        assert!(detail.item.get("manager").is_none());
        assert!(detail.warnings.is_empty());
    }
}

mod validation {
    use super::*;

    fn hotel_without_location() -> Value {
        let mut hotel = good_hotel("0xnoloc");
        hotel["dataUri"]["contents"]["descriptionUri"]["contents"]
            .as_object_mut()
            .unwrap()
            .remove("location");
        hotel
    }

    #[tokio::test]
    async fn unrequested_required_field_may_be_missing() {
        let fixture = Fixture::new();
        let index = index(vec![hotel_without_location()]);
        let hotel = lookup(&HOTELS, index.collection("hotels"), "0xnoloc").unwrap();

        let detail = fixture
            .gateway()
            .find(&HOTELS, hotel, &strings(&["name"]))
            .await
            .unwrap();
        assert_eq!(detail.item["name"], "Hotel 0xnoloc");
    }

    #[tokio::test]
    async fn requested_required_field_must_be_present() {
        let fixture = Fixture::new();
        let index = index(vec![hotel_without_location()]);
        let hotel = lookup(&HOTELS, index.collection("hotels"), "0xnoloc").unwrap();

        let err = fixture
            .gateway()
            .find(&HOTELS, hotel, &strings(&["name", "location"]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert!(err.to_string().contains("location"));
    }

    #[tokio::test]
    async fn nested_required_fields_follow_the_request() {
        let fixture = Fixture::new();
        let mut hotel = good_hotel("0x1");
        hotel["dataUri"]["contents"]["descriptionUri"]["contents"]["roomTypes"] =
            json!([{ "id": "rt-1", "name": "Single" }]);
        let index = index(vec![hotel]);
        let hotel = lookup(&HOTELS, index.collection("hotels"), "0x1").unwrap();
        let gateway = fixture.gateway();

        assert!(gateway
            .find(&HOTELS, hotel, &strings(&["roomTypes.name"]))
            .await
            .is_ok());

        let err = gateway
            .find(&HOTELS, hotel, &strings(&["roomTypes.totalQuantity"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));
    }

    #[tokio::test]
    async fn mismatched_format_version_is_a_warning() {
        let fixture = Fixture::new();
        let mut hotel = good_hotel("0xold");
        hotel["dataUri"]["contents"]["dataFormatVersion"] = json!("0.1.0");
        let index = index(vec![hotel, good_hotel("0x1")]);

        let page = fixture
            .gateway()
            .list(&HOTELS, index.collection("hotels"), ListQuery::default())
            .await
            .unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.errors.is_empty());
        let warnings = page.warnings.unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].data["id"], "0xold");
        assert_eq!(warnings[0].data["name"], "Hotel 0xold");
        assert_eq!(
            warnings[0].original_error,
            json!({
                "valid": true,
                "errors": ["Unsupported data format version 0.1.0. Supported versions: 0.2.0"]
            })
        );
    }

    #[tokio::test]
    async fn missing_format_version_is_an_error() {
        let fixture = Fixture::new();
        let mut hotel = good_hotel("0xnover");
        hotel["dataUri"]["contents"]
            .as_object_mut()
            .unwrap()
            .remove("dataFormatVersion");
        let index = index(vec![hotel]);

        let page = fixture
            .gateway()
            .list(&HOTELS, index.collection("hotels"), ListQuery::default())
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.errors.len(), 1);
        assert_eq!(page.errors[0].original_error["valid"], false);
        assert!(page.errors[0]
            .error
            .contains("Missing property `dataFormatVersion` in hotel data for id 0xnover"));
    }

    #[tokio::test]
    async fn identifier_only_request_skips_version_gate() {
        let fixture = Fixture::new();
        let mut hotel = good_hotel("0xnover");
        hotel["dataUri"]["contents"]
            .as_object_mut()
            .unwrap()
            .remove("dataFormatVersion");
        let index = index(vec![hotel]);

        let fields = strings(&["id"]);
        let query = ListQuery {
            fields: &fields,
            ..ListQuery::default()
        };
        let page = fixture
            .gateway()
            .list(&HOTELS, index.collection("hotels"), query)
            .await
            .unwrap();
        assert_eq!(page.items, vec![json!({ "id": "0xnover" })]);
    }
}

#[cfg(feature = "remote")]
mod remote_schema {
    use super::*;
    use wt_read_api::HttpSchemaFetcher;

    const COMMON: &str = r#"
components:
  schemas:
    Currency:
      type: string
      pattern: '^[A-Z]{3}$'
"#;

    fn main_schema(base: &str) -> String {
        format!(
            r#"
components:
  schemas:
    HotelDetail:
      type: object
      required: [id, name, currency]
      properties:
        name:
          type: string
        currency:
          $ref: '{base}/common.yaml#/components/schemas/Currency'
"#
        )
    }

    #[tokio::test]
    async fn remote_models_are_fetched_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/common.yaml")
            .with_status(200)
            .with_body(COMMON)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let schema_path = write_temp_file(&dir, "swagger.yaml", &main_schema(&server.url()));
        let config = GatewayConfig {
            schema_path,
            ..GatewayConfig::default()
        };
        let cache = SchemaCache::new();
        let gateway = Gateway::new(config)
            .unwrap()
            .with_cache(&cache)
            .with_fetcher(HttpSchemaFetcher);

        let mut bad = good_hotel("0xeur");
        bad["dataUri"]["contents"]["descriptionUri"]["contents"]["currency"] = json!("euro");
        let mut good = good_hotel("0xczk");
        good["dataUri"]["contents"]["descriptionUri"]["contents"]["currency"] = json!("CZK");
        let index = index(vec![bad, good]);
        let fields = strings(&["name,currency"]);

        let bad = lookup(&HOTELS, index.collection("hotels"), "0xeur").unwrap();
        let err = gateway.find(&HOTELS, bad, &fields).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation { .. }));

        let good = lookup(&HOTELS, index.collection("hotels"), "0xczk").unwrap();
        let detail = gateway.find(&HOTELS, good, &fields).await.unwrap();
        assert_eq!(detail.item["currency"], "CZK");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_remote_schema_fails_the_request() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/common.yaml")
            .with_status(404)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let schema_path = write_temp_file(&dir, "swagger.yaml", &main_schema(&server.url()));
        let config = GatewayConfig {
            schema_path,
            ..GatewayConfig::default()
        };
        let cache = SchemaCache::new();
        let gateway = Gateway::new(config).unwrap().with_cache(&cache);

        let index = index(vec![good_hotel("0x1")]);
        let err = gateway
            .list(&HOTELS, index.collection("hotels"), ListQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.code(), "#schemaUnavailable");
        assert!(cache.is_empty());
    }
}
