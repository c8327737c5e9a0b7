// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Walking list endpoints with the `older_id` cursor.

use crate::client::Client;
use crate::request::ApiRequest;
use crate::response::{item_id, response_items};
use log::debug;
use reqbunq_core::{Error, Result};
use serde_json::Value;
use std::future::Future;

/// Collect every item by calling `fetch` once per page.
///
/// `fetch` receives the `older_id` cursor (`None` for the first page) and
/// returns that page's items in server order. Pages are concatenated without
/// reordering. Paging stops after an empty page, a page with fewer than
/// `page_size` items, or a page whose last item has no id.
pub async fn paginate<F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<Value>>
where
    F: FnMut(Option<u64>) -> Fut,
    Fut: Future<Output = Result<Vec<Value>>>,
{
    let mut items = Vec::new();
    let mut cursor = None;

    loop {
        let page = fetch(cursor).await?;
        let len = page.len();
        let last_id = page.last().and_then(item_id);
        items.extend(page);

        if len == 0 || len < page_size {
            break;
        }
        match last_id {
            // A cursor that does not move would fetch the same page forever.
            Some(id) if Some(id) != cursor => cursor = Some(id),
            _ => break,
        }
        debug!("fetched {} items, continuing with older_id {:?}", items.len(), cursor);
    }

    Ok(items)
}

impl Client {
    /// Send a list request and follow pagination until every item is fetched.
    ///
    /// `count` is set to the configured page size unless the request already
    /// carries one. Items are returned as bunq sent them (wrapped in their
    /// type name), oldest page last.
    pub async fn request_all(&self, req: ApiRequest) -> Result<Vec<Value>> {
        let mut req = req;
        let page_size = match req.query_get("count").and_then(|v| v.parse::<usize>().ok()) {
            Some(count) if count > 0 => count,
            _ => {
                let size = self.config().page_size;
                req.set_query("count", size);
                size
            }
        };

        let req = &req;
        paginate(page_size, move |cursor| async move {
            let mut page = req.clone();
            if let Some(older_id) = cursor {
                page.set_query("older_id", older_id);
            }
            let resp = self.request(page).await?;
            Ok::<_, Error>(response_items(&resp).to_vec())
        })
        .await
    }
}
