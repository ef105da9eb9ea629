// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use lazy_static::lazy_static;
use std::sync::Arc;
use std::thread;

use schemaview::*;

// Ensure that materialized schemas can be shared across threads.
lazy_static! {
    static ref SCHEMA: Schema = {
        let low = low::Schema::from_json_str(
            r#"{
                "type": "object",
                "oneOf": [{ "title": "cat" }, { "title": "dog" }],
                "properties": { "name": { "type": "string" } }
            }"#,
        )
        .expect("static schema must load");
        Schema::new(Arc::new(low)).expect("static schema must materialize")
    };
}

#[test]
fn shared_schema() -> anyhow::Result<()> {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| -> anyhow::Result<Vec<Option<String>>> {
                let titles = SCHEMA
                    .one_of
                    .iter()
                    .map(|proxy| proxy.schema().map(|s| s.title))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(titles)
            })
        })
        .collect();

    for handle in handles {
        let titles = handle.join().map_err(|_| anyhow::anyhow!("thread panicked"))??;
        assert_eq!(titles, [Some("cat".to_string()), Some("dog".to_string())]);
    }
    assert!(SCHEMA.properties.contains_key("name"));
    Ok(())
}
