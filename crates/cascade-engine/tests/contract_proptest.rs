use proptest::prelude::*;

use cascade_core::{PipelineError, Stage, StageFn, StageOutput, Value};
use cascade_engine::config::parser;
use cascade_engine::config::validator;

fn grouped_stage(group_len: usize, returns_len: usize) -> Stage {
    let func = StageFn::new(0, move |_| {
        Ok(StageOutput::Tuple(
            (0..group_len).map(|i| Value::from(i as u64)).collect(),
        ))
    });
    let returns: Vec<String> = (0..returns_len).map(|i| format!("out{i}")).collect();
    Stage::new("grouped", func, Vec::<String>::new(), returns).expect("arity matches")
}

proptest! {
    #[test]
    fn grouped_results_reconcile_only_on_matching_arity(
        group_len in 0_usize..6,
        returns_len in 0_usize..6,
    ) {
        let stage = grouped_stage(group_len, returns_len);
        let result = stage.call(Vec::new());

        if returns_len == 1 {
            // One declared return always takes the whole group as one value.
            let values = result.expect("single-return call must succeed");
            prop_assert_eq!(values.len(), 1);
            prop_assert_eq!(values[0].as_array().expect("array value").len(), group_len);
        } else if returns_len == group_len {
            let values = result.expect("matching arity must succeed");
            prop_assert_eq!(values.len(), returns_len);
        } else {
            let err = result.expect_err("mismatched arity must fail");
            prop_assert!(matches!(err, PipelineError::InvalidResults { .. }), "expected InvalidResults");
        }
    }

    #[test]
    fn json_backend_validity_depends_on_location(has_location in any::<bool>()) {
        let location_line = if has_location {
            "\n  location: /tmp/prop_values"
        } else {
            ""
        };

        let yaml = format!(
            r#"
version: "1.0"
pipeline: prop_storage_policy
storage:
  backend: json{location_line}
"#
        );

        let config = parser::parse_pipeline_str(&yaml).expect("generated yaml must parse");
        let result = validator::validate_pipeline(&config);

        if has_location {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn declared_param_count_gates_construction(
        arity in 0_usize..5,
        given in 0_usize..5,
    ) {
        let func = StageFn::new(arity, |_| Ok(StageOutput::Void));
        let params: Vec<String> = (0..given).map(|i| format!("p{i}")).collect();
        let result = Stage::new("sized", func, params, Vec::<String>::new());

        if arity == given {
            prop_assert!(result.is_ok());
        } else {
            let err = result.expect_err("arity mismatch must fail");
            prop_assert!(matches!(err, PipelineError::InvalidParams { .. }), "expected InvalidParams");
        }
    }
}
