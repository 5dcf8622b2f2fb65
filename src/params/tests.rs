#[cfg(test)]
mod tests {
    use crate::error::MogError;
    use crate::params::{MultiParams, ParamList, Params, ScalarParam};

    fn source() -> MultiParams {
        MultiParams::new()
            .with_child("pos", ParamList::named(&[("x", 10.0), ("y", 20.0)]))
            .unwrap()
            .with_child("flux", ScalarParam::named("flux", 100.0).with_step_size(0.5))
            .unwrap()
            .with_child(
                "shape",
                ParamList::named(&[("re", 1.5), ("ab", 0.8), ("phi", 30.0)]),
            )
            .unwrap()
    }

    fn catalog() -> MultiParams {
        let mut cat = MultiParams::new();
        cat.push_named("src0", source()).unwrap();
        cat.push(source());
        cat.push_named("sky", ScalarParam::named("sky", 0.0)).unwrap();
        cat
    }

    fn assert_views_agree(p: &dyn Params) {
        let n = p.count_active();
        assert_eq!(p.get_active().len(), n);
        assert_eq!(p.names().len(), n);
        assert_eq!(p.step_sizes().len(), n);
    }

    #[test]
    fn test_depth_first_ordering_and_names() {
        let src = source();

        assert_eq!(src.count_active(), 6);
        assert_eq!(src.get_active(), vec![10.0, 20.0, 100.0, 1.5, 0.8, 30.0]);
        assert_eq!(
            src.names(),
            vec!["pos.x", "pos.y", "flux.flux", "shape.re", "shape.ab", "shape.phi"]
        );
        assert_eq!(src.step_sizes(), vec![1.0, 1.0, 0.5, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_nested_names_use_param_index_for_unnamed_children() {
        let cat = catalog();
        let names = cat.names();

        assert_eq!(names[0], "src0.pos.x");
        assert_eq!(names[6], "param1.pos.x");
        assert_eq!(names.last().unwrap(), "sky.sky");
        assert_views_agree(&cat);
    }

    #[test]
    fn test_views_agree_under_freeze_thaw_sequences() {
        let mut cat = catalog();
        assert_views_agree(&cat);

        cat.freeze("sky").unwrap();
        assert_views_agree(&cat);
        assert_eq!(cat.count_active(), 12);

        cat.child_mut("src0").unwrap().freeze("shape").unwrap();
        assert_views_agree(&cat);
        assert_eq!(cat.count_active(), 9);

        cat.child_as_mut::<MultiParams>("src0")
            .unwrap()
            .child_mut("pos")
            .unwrap()
            .freeze("y")
            .unwrap();
        assert_views_agree(&cat);
        assert_eq!(cat.count_active(), 8);

        cat.thaw_all();
        assert_views_agree(&cat);
        assert_eq!(cat.count_active(), 9);

        cat.thaw_all_recursive();
        assert_views_agree(&cat);
        assert_eq!(cat.count_active(), 13);
    }

    #[test]
    fn test_set_active_round_trip_is_a_no_op() {
        let mut cat = catalog();
        cat.child_mut("src0").unwrap().freeze("flux").unwrap();

        let before = cat.get_all();
        let active = cat.get_active();
        cat.set_active(&active).unwrap();

        assert_eq!(cat.get_all(), before);
        assert_eq!(cat.get_active(), active);
    }

    #[test]
    fn test_set_active_rejects_wrong_length() {
        let mut src = source();
        let before = src.get_all();

        let result = src.set_active(&[1.0, 2.0]);
        assert!(matches!(result, Err(MogError::ArgumentError(_))));
        assert_eq!(src.get_all(), before);

        let mut list = ParamList::named(&[("a", 1.0)]);
        assert!(list.set_active(&[1.0, 2.0]).is_err());
        assert_eq!(list.values(), &[1.0]);
    }

    #[test]
    fn test_set_active_skips_frozen_children() {
        let mut src = source();
        src.freeze("pos").unwrap();
        src.set_active(&[7.0, 2.0, 0.5, 45.0]).unwrap();

        assert_eq!(src.get_all(), vec![10.0, 20.0, 7.0, 2.0, 0.5, 45.0]);
    }

    #[test]
    fn test_freeze_all_yields_empty_vector() {
        let mut cat = catalog();
        cat.freeze_all();

        assert_eq!(cat.count_active(), 0);
        assert!(cat.get_active().is_empty());
        assert!(cat.names().is_empty());
        cat.set_active(&[]).unwrap();

        let mut list = ParamList::named(&[("a", 1.0), ("b", 2.0)]);
        list.freeze_all();
        assert_eq!(list.count_active(), 0);
        assert!(list.get_active().is_empty());
    }

    #[test]
    fn test_set_one_returns_prior_and_touches_only_that_slot() {
        let mut cat = catalog();
        cat.child_mut("src0").unwrap().freeze("pos").unwrap();

        let before = cat.get_active();
        for i in 0..before.len() {
            let mut tree = catalog();
            tree.child_mut("src0").unwrap().freeze("pos").unwrap();

            let old = tree.set_one(i, -1.0).unwrap();
            assert_eq!(old, before[i]);

            let after = tree.get_active();
            for (j, (&a, &b)) in after.iter().zip(&before).enumerate() {
                if j == i {
                    assert_eq!(a, -1.0);
                } else {
                    assert_eq!(a, b);
                }
            }
        }

        let n = before.len();
        assert!(matches!(
            cat.set_one(n, 0.0),
            Err(MogError::IndexError { index, len }) if index == n && len == n
        ));
    }

    #[test]
    fn test_freeze_by_unknown_name_is_key_error() {
        let mut src = source();

        assert!(matches!(src.freeze("nope"), Err(MogError::KeyError(_))));
        assert!(matches!(src.thaw("nope"), Err(MogError::KeyError(_))));
        assert!(matches!(src.is_frozen("nope"), Err(MogError::KeyError(_))));
        assert!(src.freeze_many(&["pos", "nope"]).is_err());
        assert!(!src.is_frozen("pos").unwrap());
    }

    #[test]
    fn test_freeze_all_except() {
        let mut src = source();
        src.freeze_all_except(&["flux"]).unwrap();

        assert_eq!(src.get_active(), vec![100.0]);
        assert_eq!(src.frozen_names(), vec!["pos", "shape"]);
        assert_eq!(src.thawed_names(), vec!["flux"]);
    }

    #[test]
    fn test_child_as_wrong_type() {
        let src = source();

        assert!(src.child_as::<ParamList>("pos").is_ok());
        assert!(matches!(
            src.child_as::<ScalarParam>("pos"),
            Err(MogError::ArgumentError(_))
        ));
        assert!(matches!(
            src.child_as::<ScalarParam>("nope"),
            Err(MogError::KeyError(_))
        ));
    }

    #[test]
    fn test_duplicate_child_name_is_rejected() {
        let mut src = source();
        assert!(src.push_named("pos", ScalarParam::new(1.0)).is_err());
        assert_eq!(src.len(), 3);
    }

    #[test]
    fn test_param_list_by_name() {
        let mut list = ParamList::named(&[("x", 1.0), ("y", 2.0)]);

        assert_eq!(list.set_value("y", 5.0).unwrap(), 2.0);
        assert_eq!(list.value("y").unwrap(), 5.0);
        assert!(list.value("z").is_err());
        assert_eq!(list.to_string(), "ParamList: x=1, y=5");

        let mut unnamed = ParamList::new(vec![3.0, 4.0]);
        assert_eq!(unnamed.names(), vec!["param0", "param1"]);

        // unnamed leaf slots are numbered among the liquid ones
        unnamed.liquidity_mut().set_liquid(0, false).unwrap();
        assert_eq!(unnamed.names(), vec!["param0"]);
        assert_eq!(unnamed.get_active(), vec![4.0]);
        unnamed.thaw_all();
        assert!(unnamed.clone().with_step_sizes(vec![0.1]).is_err());
        assert_eq!(
            unnamed.with_step_sizes(vec![0.1, 0.2]).unwrap().step_sizes(),
            vec![0.1, 0.2]
        );
    }

    #[test]
    fn test_clone_is_a_deep_snapshot() {
        let mut cat = catalog();
        cat.freeze("sky").unwrap();
        let snapshot = cat.clone();

        let n = cat.count_active();
        cat.set_active(&vec![-1.0; n]).unwrap();
        cat.child_mut("src0").unwrap().freeze("flux").unwrap();

        assert_eq!(snapshot.count_active(), n);
        assert_eq!(snapshot.get_active()[..3], [10.0, 20.0, 100.0]);
        assert!(snapshot.is_frozen("sky").unwrap());
        assert!(!snapshot.child("src0").unwrap().is_frozen("flux").unwrap());
        assert_eq!(snapshot.child_as::<MultiParams>("src0").unwrap().len(), 3);
        assert_views_agree(&snapshot);
    }
}
