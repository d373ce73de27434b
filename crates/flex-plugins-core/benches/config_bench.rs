use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flex_plugins_core::FlexConfig;

fn bench_config_parse(c: &mut Criterion) {
    let toml_text = r#"
[credentials]
account_sid = "ACxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"
auth_token = "token"

[api]
serverless_url = "https://serverless.twilio.com/v1"
plugins_url = "https://flex-api.twilio.com/v1/PluginService"

[polling]
timeout_ms = 30000
interval_ms = 500

[scripts]
runner = ["npx", "flex-plugin-scripts"]
"#;

    c.bench_function("parse_config", |b| {
        b.iter(|| {
            let _cfg: FlexConfig = toml::from_str(black_box(toml_text)).unwrap();
        })
    });
}

criterion_group!(benches, bench_config_parse);
criterion_main!(benches);
