//! End-to-end flows: source change → rebuild → snapshot diff → browser event.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tokio_stream::StreamExt;
use webdev_live::{
    ChangeBus, DeletePolicy, DependencyGraph, InlineCompiler, LiveHub, LiveReload, LiveSettings,
    RebuildOptions, Rebuilder, SassPipeline, SnapshotStore, Stamp, Subscription,
};

struct Dev {
    _temp: TempDir,
    web: PathBuf,
    classes: PathBuf,
    pipeline: SassPipeline,
    reload: LiveReload,
    _bus: ChangeBus,
}

fn backdate(path: &Path) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(60))
        .unwrap();
}

fn dev_session() -> Dev {
    let temp = TempDir::new().unwrap();
    let web = temp.path().join("web");
    let classes = temp.path().join("classes");
    fs::create_dir_all(&web).unwrap();
    fs::create_dir_all(&classes).unwrap();
    fs::write(
        web.join("styles.scss"),
        "@import \"base\";\n.page { color: red; }\n",
    )
    .unwrap();
    fs::write(web.join("_base.scss"), "body { margin: 0; }\n").unwrap();
    fs::write(web.join("app.js"), "start();\n").unwrap();

    let options = RebuildOptions::new(vec![web.clone()], &classes).with_delete_policy(DeletePolicy {
        retry_window: Duration::from_millis(500),
        retry_interval: Duration::from_millis(10),
        settle_interval: Duration::from_millis(20),
        settle_attempts: 5,
    });
    let rebuilder = Rebuilder::new(
        options,
        Arc::new(InlineCompiler::new()),
        Arc::new(DependencyGraph::new()),
    );
    let bus = ChangeBus::new();
    let pipeline = SassPipeline::new(rebuilder, bus.clone(), "web-bundler");

    let report = pipeline.rebuilder().full_build().unwrap();
    assert_eq!(report.written, vec![classes.join("styles.css")]);
    assert_eq!(report.copied, vec![classes.join("app.js")]);
    // Outputs written a moment ago could share a timestamp with the next write.
    backdate(&classes.join("styles.css"));
    backdate(&classes.join("app.js"));

    let snapshot = Arc::new(
        SnapshotStore::initialize(&classes, ["/styles.css", "/app.js"], &[".map"]).unwrap(),
    );
    let reload = LiveReload::new(
        LiveSettings::default(),
        snapshot,
        LiveHub::default(),
        &bus,
    );

    Dev {
        _temp: temp,
        web,
        classes,
        pipeline,
        reload,
        _bus: bus,
    }
}

async fn connected(reload: &LiveReload) -> Subscription {
    let mut subscription = reload.hub().open().unwrap();
    let connect = subscription.next().await.unwrap();
    assert!(connect.contains("event: connect"));
    subscription
}

#[tokio::test]
async fn partial_change_pushes_updated_stylesheet() {
    let dev = dev_session();
    let mut first = connected(&dev.reload).await;
    let mut second = connected(&dev.reload).await;

    fs::write(dev.web.join("_base.scss"), "body { margin: 4px; }\n").unwrap();
    assert_eq!(
        dev.pipeline.plan(["_base.scss"]),
        BTreeSet::from(["styles.scss".to_string()])
    );
    dev.pipeline.on_sources_changed(["_base.scss"]).unwrap();

    let expected = "id: 1\nevent: change\ndata: {\"added\":[],\"removed\":[],\"updated\":[\"/styles.css\"]}\n\n";
    assert_eq!(first.next().await.unwrap(), expected);
    assert_eq!(second.next().await.unwrap(), expected);
    assert!(fs::read_to_string(dev.classes.join("styles.css")).unwrap().contains("4px"));
}

#[tokio::test]
async fn plain_resource_edit_pushes_updated_copy() {
    let dev = dev_session();
    let mut subscription = connected(&dev.reload).await;

    fs::write(dev.web.join("app.js"), "start(true);\n").unwrap();
    assert!(dev.pipeline.plan(["app.js"]).is_empty());
    let report = dev.pipeline.on_sources_changed(["app.js"]).unwrap();

    assert_eq!(report.copied, vec![dev.classes.join("app.js")]);
    assert!(report.written.is_empty());
    assert_eq!(
        subscription.next().await.unwrap(),
        "id: 1\nevent: change\ndata: {\"added\":[],\"removed\":[],\"updated\":[\"/app.js\"]}\n\n"
    );
    assert_eq!(
        fs::read_to_string(dev.classes.join("app.js")).unwrap(),
        "start(true);\n"
    );
}

#[tokio::test]
async fn new_plain_resource_is_copied_and_tracked() {
    let dev = dev_session();
    let _subscription = connected(&dev.reload).await;

    fs::create_dir_all(dev.web.join("img")).unwrap();
    fs::write(dev.web.join("img/logo.svg"), "<svg/>").unwrap();
    let report = dev.pipeline.on_sources_changed(["img/logo.svg"]).unwrap();

    assert_eq!(report.copied, vec![dev.classes.join("img/logo.svg")]);
    let key = "/img/logo.svg".into();
    assert!(matches!(dev.reload.snapshot().stamp(&key), Some(Stamp::Seen(_))));
}

#[tokio::test]
async fn deleted_source_removes_output_and_reports_removed() {
    let dev = dev_session();
    let mut subscription = connected(&dev.reload).await;

    fs::remove_file(dev.web.join("styles.scss")).unwrap();
    let report = dev.pipeline.on_sources_changed(["styles.scss"]).unwrap();

    assert_eq!(report.deleted, vec![dev.classes.join("styles.css")]);
    assert!(!dev.classes.join("styles.css").exists());

    let frame = subscription.next().await.unwrap();
    assert!(frame.contains(r#""removed":["/styles.css"]"#));
    assert!(frame.contains(r#""updated":[]"#));
}

#[tokio::test]
async fn build_error_sends_bundling_error_without_data() {
    let dev = dev_session();
    let mut subscription = connected(&dev.reload).await;

    fs::write(dev.web.join("styles.scss"), "..broken { color: red; }\n").unwrap();
    let report = dev.pipeline.on_sources_changed(["styles.scss"]).unwrap();
    assert_eq!(report.failures.len(), 1);

    let frame = subscription.next().await.unwrap();
    assert_eq!(frame, "id: 1\nevent: bundling-error\n\n");
    assert!(subscription.next().await.is_none());
    assert_eq!(dev.reload.hub().connection_count(), 0);
}

#[tokio::test]
async fn unrelated_notification_is_ignored() {
    let dev = dev_session();
    let mut subscription = connected(&dev.reload).await;

    fs::write(dev.classes.join("styles.css"), "changed{}").unwrap();
    let ignored = HashSet::from(["/styles.css".to_string()]);
    assert_eq!(dev.reload.handle(&ignored).unwrap(), None);

    // Nothing queued: the next frame only arrives after a real build notification.
    dev.pipeline.on_sources_changed(["logo.png"]).unwrap();
    let frame = subscription.next().await.unwrap();
    assert!(frame.contains(r#""updated":["/styles.css"]"#));
}
