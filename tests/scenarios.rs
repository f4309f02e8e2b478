use glam::{Mat4, Vec3};
use pretty_assertions::assert_eq;
use rig_bake::file_formats::animationfile::from_row_major;
use rig_bake::{bake_scene, bake_to_path, BakeError, MemoryScene, NodeAttribute, SceneGraph, TimeSpan};

#[test]
fn single_unskinned_joint() {
    let mut scene = MemoryScene::new();
    let root = scene.root();
    scene.add_node(root, "hips", NodeAttribute::Skeleton);
    scene.add_animation_stack("idle", Some(TimeSpan::new(0, 0)));

    let file = bake_scene(&scene).unwrap();
    assert_eq!(file.skeleton.count, 1);
    assert_eq!(file.skeleton.joint[0].parent, -1);
    assert_eq!(from_row_major(&file.skeleton.joint[0].mat), Mat4::IDENTITY);
    assert!(file.animation[0].track.is_empty());
}

#[test]
fn child_joint_bound_over_four_frames() {
    let mut scene = MemoryScene::new();
    let root = scene.root();
    let hips = scene.add_node(root, "hips", NodeAttribute::Skeleton);
    let arm = scene.add_node(hips, "arm", NodeAttribute::Skeleton);
    let mesh = scene.add_node(root, "body", NodeAttribute::Mesh);
    scene.set_local_transform(arm, Mat4::from_translation(Vec3::X));
    scene.add_animation_stack("swing", Some(TimeSpan::new(0, 3)));
    let cluster = scene.rest_cluster(mesh, arm);
    scene.add_skin(mesh, vec![cluster]);

    let file = bake_scene(&scene).unwrap();
    assert_eq!(file.skeleton.count, 2);
    assert!(from_row_major(&file.skeleton.joint[1].mat)
        .abs_diff_eq(Mat4::from_translation(-Vec3::X), 1e-6));

    let clip = &file.animation[0];
    assert_eq!(clip.name, "swing");
    assert_eq!(clip.animation_length, 4);
    assert_eq!(clip.track.len(), 1);
    assert_eq!(clip.track[0].id, 1);
    assert_eq!(clip.track[0].name, "arm");
    let frames: Vec<i64> = clip.track[0].frame.iter().map(|frame| frame.num).collect();
    assert_eq!(frames, vec![0, 1, 2, 3]);
}

#[test]
fn only_first_stack_is_baked() {
    let mut scene = MemoryScene::new();
    let root = scene.root();
    let hips = scene.add_node(root, "hips", NodeAttribute::Skeleton);
    let mesh = scene.add_node(root, "body", NodeAttribute::Mesh);
    scene.add_animation_stack("walk", Some(TimeSpan::new(0, 1)));
    scene.add_animation_stack("run", Some(TimeSpan::new(0, 29)));
    let cluster = scene.rest_cluster(mesh, hips);
    scene.add_skin(mesh, vec![cluster]);

    let file = bake_scene(&scene).unwrap();
    assert_eq!(file.animation.len(), 1);
    assert_eq!(file.animation[0].name, "walk");
    assert_eq!(file.animation[0].animation_length, 2);
}

#[test]
fn unknown_cluster_joint_writes_nothing() {
    let mut scene = MemoryScene::new();
    let root = scene.root();
    scene.add_node(root, "hips", NodeAttribute::Skeleton);
    let stray = scene.add_node(root, "ghost", NodeAttribute::Null);
    let mesh = scene.add_node(root, "body", NodeAttribute::Mesh);
    scene.add_animation_stack("idle", Some(TimeSpan::new(0, 0)));
    let cluster = scene.rest_cluster(mesh, stray);
    scene.add_skin(mesh, vec![cluster]);

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");
    let err = bake_to_path(&scene, &output).unwrap_err();
    assert!(matches!(err, BakeError::JointNotFound(name) if name == "ghost"));
    assert!(!output.exists());
}

#[test]
fn duplicate_binding_is_rejected() {
    let mut scene = MemoryScene::new();
    let root = scene.root();
    let hips = scene.add_node(root, "hips", NodeAttribute::Skeleton);
    let body = scene.add_node(root, "body", NodeAttribute::Mesh);
    let head = scene.add_node(root, "head", NodeAttribute::Mesh);
    scene.add_animation_stack("idle", Some(TimeSpan::new(0, 0)));
    let first = scene.rest_cluster(body, hips);
    scene.add_skin(body, vec![first]);
    let second = scene.rest_cluster(head, hips);
    scene.add_skin(head, vec![second]);

    assert!(matches!(
        bake_scene(&scene),
        Err(BakeError::DuplicateBinding(name)) if name == "hips"
    ));
}

#[test]
fn baking_is_deterministic() {
    let mut scene = MemoryScene::new();
    let root = scene.root();
    let hips = scene.add_node(root, "hips", NodeAttribute::Skeleton);
    let mesh = scene.add_node(root, "body", NodeAttribute::Mesh);
    scene.add_animation_stack("idle", Some(TimeSpan::new(0, 5)));
    for frame in 0..=5 {
        scene.set_keyed_local_transform(hips, frame, Mat4::from_rotation_y(frame as f32 * 0.1));
    }
    let cluster = scene.rest_cluster(mesh, hips);
    scene.add_skin(mesh, vec![cluster]);

    let first = bake_scene(&scene).unwrap().to_json().unwrap();
    let second = bake_scene(&scene).unwrap().to_json().unwrap();
    assert_eq!(first, second);
}
