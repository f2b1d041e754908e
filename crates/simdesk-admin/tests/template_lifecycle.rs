use std::sync::Arc;

use simdesk_admin::{AdminError, TemplateService};
use simdesk_config::{Action, ActionKind, FlowDef, FlowNode, Handler, Stage, TaskTemplate};
use simdesk_editor::{FlowEditor, ModuleEditor};
use simdesk_modules::{FsModuleRegistry, ModuleDef, ModuleDefaults, ModuleRegistry};
use simdesk_store::{SqliteStore, Store};

fn approval_flow() -> FlowDef {
  FlowDef::new(vec![
    FlowNode::new(Stage::Draft)
      .with_handler(Handler::Initiator)
      .with_action(Action::new(ActionKind::Save))
      .with_action(Action::new(ActionKind::Submit).with_target(Stage::Pending)),
    FlowNode::new(Stage::Pending)
      .with_handler(Handler::role("Supervisor"))
      .with_action(Action::new(ActionKind::Approve).with_target(Stage::Done))
      .with_action(
        Action::new(ActionKind::Reject)
          .with_target(Stage::Draft)
          .with_next_handler(Handler::Initiator),
      ),
    FlowNode::new(Stage::Done),
  ])
}

async fn setup() -> (
  tempfile::TempDir,
  FsModuleRegistry,
  TemplateService<FsModuleRegistry>,
) {
  let dir = tempfile::tempdir().unwrap();
  let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().await.unwrap());
  let service = TemplateService::new(store, FsModuleRegistry::new(dir.path()));
  let registry = FsModuleRegistry::new(dir.path());
  (dir, registry, service)
}

#[tokio::test]
async fn edit_validate_and_save_template() {
  let (_dir, registry, service) = setup().await;

  registry
    .install(ModuleDef {
      id: "shelf_photo".to_string(),
      module_type: "image".to_string(),
      name: "Shelf Photo".to_string(),
      icon: "Camera".to_string(),
      description: String::new(),
      config: ModuleDefaults {
        required: true,
        ..Default::default()
      },
    })
    .await
    .unwrap();
  let catalog = registry.catalog().await.unwrap();

  let mut template = TaskTemplate::new("Store audit");
  let mut modules = ModuleEditor::default();
  modules
    .select(&["customer", "shelf_photo"], &catalog)
    .unwrap();
  template.modules = modules.into_modules();
  template.flow_config = approval_flow();

  let created = service.create(&template).await.unwrap();
  assert_eq!(created.revision, 1);
  assert!(created.data.modules[1].required);

  // Insert a second approval level and route the first approval through it.
  let mut editor = FlowEditor::new(created.data.flow_config.clone());
  let pending = editor.flow().node(Stage::Pending).unwrap().key;
  let pending2 = editor
    .add_node(
      FlowNode::new(Stage::Pending2)
        .with_handler(Handler::role("Manager"))
        .with_action(Action::new(ActionKind::Approve).with_target(Stage::Done)),
    )
    .unwrap();
  editor.move_node(pending2, 2).unwrap();
  editor
    .set_action_target(pending, ActionKind::Approve, Some(Stage::Pending2), None)
    .unwrap();
  editor
    .set_node_modules(pending2, vec!["shelf_photo".to_string()], &catalog)
    .unwrap();

  let mut edited = created.data.clone();
  edited.flow_config = editor.into_flow();
  let saved = service.save(&created.id, &edited, created.revision).await.unwrap();
  assert_eq!(saved.revision, 2);

  let stages: Vec<_> = saved.data.flow_config.stages().collect();
  assert_eq!(
    stages,
    vec![Stage::Draft, Stage::Pending, Stage::Pending2, Stage::Done]
  );
  let approve = saved
    .data
    .flow_config
    .node(Stage::Pending)
    .unwrap()
    .action(ActionKind::Approve)
    .unwrap();
  assert_eq!(approve.target_node, Some(Stage::Pending2));

  // A second editor still holding revision 1 loses.
  let stale = service.save(&created.id, &created.data, 1).await;
  assert!(matches!(
    stale,
    Err(AdminError::Store(simdesk_store::Error::Conflict {
      expected: 1,
      actual: 2,
      ..
    }))
  ));
}

#[tokio::test]
async fn deleting_a_node_keeps_template_saveable() {
  let (_dir, _registry, service) = setup().await;

  let mut template = TaskTemplate::new("Visit");
  template.flow_config = approval_flow();
  let created = service.create(&template).await.unwrap();

  let mut editor = FlowEditor::new(created.data.flow_config.clone());
  let done = editor.flow().node(Stage::Done).unwrap().key;
  let deleted = editor.delete_node(done).unwrap();
  assert_eq!(deleted.cleared_targets, 1);

  let mut edited = created.data.clone();
  edited.flow_config = editor.into_flow();
  let report = service.validate(&edited).await.unwrap();
  assert!(report.is_valid(), "{:?}", report.errors);

  service.save(&created.id, &edited, created.revision).await.unwrap();
}

#[tokio::test]
async fn unknown_module_blocks_save() {
  let (_dir, _registry, service) = setup().await;

  let mut template = TaskTemplate::new("Visit");
  template.flow_config =
    FlowDef::new(vec![FlowNode::new(Stage::Draft).with_module("fingerprint")]);

  let result = service.create(&template).await;
  match result {
    Err(AdminError::InvalidTemplate(invalid)) => {
      assert!(invalid.to_string().contains("fingerprint"));
    }
    other => panic!("expected invalid template, got {:?}", other.map(|d| d.id)),
  }
}
