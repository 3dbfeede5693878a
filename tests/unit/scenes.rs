use super::*;

#[test]
fn scene_ids_parse_leniently() {
    assert_eq!("hyperborea".parse::<SceneId>().unwrap(), SceneId::Hyperborea);
    assert_eq!("Storm-Dusk".parse::<SceneId>().unwrap(), SceneId::StormDusk);
    assert_eq!(" moonlight ".parse::<SceneId>().unwrap(), SceneId::Moonlight);
    let err = "synthwave".parse::<SceneId>().unwrap_err();
    assert!(err.to_string().contains("unknown scene"));
}

#[test]
fn display_matches_serde_names() {
    for id in SceneId::ALL {
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(id.to_string().parse::<SceneId>().unwrap(), id);
    }
}

#[test]
fn every_scene_instantiates_with_its_default_seed() {
    let cache = LayoutCache::new();
    let params = LayoutParams::default();
    for id in SceneId::ALL {
        let scene = create_scene(id, &cache, id.default_seed(), &params, None).unwrap();
        assert_eq!(scene.scene_id(), id);
        assert_eq!(scene.seed(), id.default_seed());
        assert!(!scene.stage_names().is_empty());
    }
}

#[test]
fn renderers_with_the_same_key_share_one_layout() {
    let cache = LayoutCache::new();
    let params = LayoutParams::default();
    let a = create_scene(SceneId::StormDusk, &cache, 19, &params, None).unwrap();
    let b = create_scene(SceneId::StormDusk, &cache, 19, &params, None).unwrap();
    let c = create_scene(SceneId::StormDusk, &cache, 20, &params, None).unwrap();
    assert!(std::rc::Rc::ptr_eq(&a.layout_any(), &b.layout_any()));
    assert!(!std::rc::Rc::ptr_eq(&a.layout_any(), &c.layout_any()));
    assert_eq!(cache.generation_count(), 2);

    drop((a, b, c));
    assert_eq!(cache.live_entries(), 0);
}
