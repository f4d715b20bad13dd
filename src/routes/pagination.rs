//! Shared pagination helpers for the analytics endpoints (spec §4.7): one-indexed `page`,
//! clamped `pageSize`, two response shapes depending on the endpoint family.

use serde::{Deserialize, Deserializer, Serialize};

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}

/// `#[serde(flatten)]` routes query-string values through serde's content-buffering path,
/// which represents every value as a string regardless of the target field's type — so a
/// plain `u32` field fails to deserialize. Accept either representation.
fn u32_from_query<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;

    impl serde::de::Visitor<'_> for Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a u32 or a string containing a u32")
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<u32, E> {
            u32::try_from(v).map_err(serde::de::Error::custom)
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<u32, E> {
            u32::try_from(v).map_err(serde::de::Error::custom)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<u32, E> {
            v.parse().map_err(serde::de::Error::custom)
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page", deserialize_with = "u32_from_query")]
    pub page: u32,
    #[serde(default = "default_page_size", rename = "pageSize", deserialize_with = "u32_from_query")]
    pub page_size: u32,
}

impl PageParams {
    pub fn normalized(self) -> (u32, u32) {
        (self.page.max(1), self.page_size.clamp(1, 1000))
    }
}

/// Slices `items` to the requested page. Returns the page slice and the total item count.
pub fn paginate<T>(items: &[T], params: PageParams) -> (&[T], usize) {
    let (page, page_size) = params.normalized();
    let start = (page as usize - 1) * page_size as usize;
    if start >= items.len() {
        (&[], items.len())
    } else {
        let end = (start + page_size as usize).min(items.len());
        (&items[start..end], items.len())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ByUserPagination {
    pub page: u32,
    pub page_size: u32,
    pub total_users: usize,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl ByUserPagination {
    pub fn build(params: PageParams, total_users: usize) -> ByUserPagination {
        let (page, page_size) = params.normalized();
        let total_pages = total_users.div_ceil(page_size as usize).max(1) as u32;
        ByUserPagination {
            page,
            page_size,
            total_users,
            total_pages,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}
