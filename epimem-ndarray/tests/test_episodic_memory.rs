use epimem_ndarray::{
    ArrayStore, BatchIndex, DType, EpisodicMemoryConfig, ExperienceBufferBase, LeafSpec,
    MemoryError, NdarrayMemory, NdarrayRecord, ReplayBufferBase, Schema, SliceIndex, Tree,
    TypedArray,
};
use test_log::test;

fn schema() -> Schema {
    Schema::new(Tree::group(vec![
        ("action", Tree::leaf(LeafSpec::new(&[], DType::I64))),
        ("reward", Tree::leaf(LeafSpec::f32(&[]))),
        ("done", Tree::leaf(LeafSpec::scalar(DType::Bool))),
        (
            "state_next",
            Tree::group(vec![
                ("position", Tree::leaf(LeafSpec::f32(&[2]))),
                ("step", Tree::leaf(LeafSpec::new(&[], DType::I32))),
            ]),
        ),
    ]))
    .unwrap()
}

/// Record whose fields are all derived from `t`.
fn record(t: i32, done: bool) -> NdarrayRecord {
    Tree::group(vec![
        ("action", Tree::leaf(TypedArray::from(t as i64))),
        ("reward", Tree::leaf(TypedArray::from(t as f32))),
        ("done", Tree::leaf(TypedArray::from(done))),
        (
            "state_next",
            Tree::group(vec![
                (
                    "position",
                    Tree::leaf(TypedArray::from(vec![t as f32, -(t as f32)])),
                ),
                ("step", Tree::leaf(TypedArray::from(t))),
            ]),
        ),
    ])
}

fn memory(max_episode_length: usize, max_total_experiences: usize) -> NdarrayMemory {
    let config = EpisodicMemoryConfig::new(schema(), max_episode_length)
        .max_total_experiences(max_total_experiences)
        .batch_size(2)
        .seed(42);
    NdarrayMemory::build(&config).unwrap()
}

/// Pushes an episode of `length` steps, tagging step `s` with `100 * tag + s`.
fn push_episode(memory: &mut NdarrayMemory, tag: i32, length: usize) {
    for s in 0..length {
        let done = s + 1 == length;
        memory
            .add_experience(&record(100 * tag + s as i32, done))
            .unwrap();
    }
}

fn leaf<'a>(tree: &'a NdarrayRecord, path: &str) -> &'a TypedArray {
    tree.get_path(path).and_then(Tree::as_leaf).unwrap()
}

#[test]
fn test_capacity_error() {
    let config = EpisodicMemoryConfig::new(schema(), 10).max_total_experiences(9);
    assert!(matches!(
        NdarrayMemory::build(&config),
        Err(MemoryError::CapacityError(_))
    ));
}

#[test]
fn test_single_episode_commit() {
    let mut memory = memory(4, 12);
    assert_eq!(memory.capacity(), 3);

    memory.add_experience(&record(0, false)).unwrap();
    memory.add_experience(&record(1, false)).unwrap();
    assert_eq!(memory.local_step(), 2);
    assert_eq!(memory.used_size(), 0);
    assert_eq!(memory.write_pointer(), 0);

    memory.add_experience(&record(2, true)).unwrap();
    assert_eq!(memory.get_episode_lengths(&[0]).unwrap(), vec![3]);
    assert_eq!(memory.used_size(), 1);
    assert_eq!(memory.write_pointer(), 1);
    assert_eq!(memory.local_step(), 0);
    assert_eq!(memory.episode_count(), 1);
    assert_eq!(memory.len(), 1);

    let episode = memory.get_episode(0).unwrap();
    assert_eq!(episode.len(), 3);
    assert_eq!(
        leaf(&episode.fields, "action"),
        &TypedArray::from(vec![0i64, 1, 2])
    );
    assert_eq!(
        leaf(&episode.fields, "done"),
        &TypedArray::from(vec![false, false, true])
    );
    assert_eq!(
        leaf(&episode.fields, "state_next/position"),
        &TypedArray::from_shape_vec(&[3, 2], vec![0.0f32, 0.0, 1.0, -1.0, 2.0, -2.0]).unwrap()
    );
}

#[test]
fn test_get_episode_accepts_used_size() {
    let mut memory = memory(4, 12);
    push_episode(&mut memory, 1, 2);
    push_episode(&mut memory, 2, 3);
    assert_eq!(memory.used_size(), 2);
    assert_eq!(memory.write_pointer(), 2);

    // Slot 2 was never written: its length reads as 1 and its row is zero.
    let episode = memory.get_episode(2).unwrap();
    assert_eq!(episode.episode_length, 1);
    assert_eq!(leaf(&episode.fields, "action"), &TypedArray::from(vec![0i64]));
    assert_eq!(
        leaf(&episode.fields, "state_next/position"),
        &TypedArray::from_shape_vec(&[1, 2], vec![0.0f32, 0.0]).unwrap()
    );

    assert_eq!(
        memory.get_episode(3).unwrap_err(),
        MemoryError::IndexError { index: 3, bound: 2 }
    );
}

#[test]
fn test_sampling_needs_two_episodes() {
    let mut memory = memory(4, 12);
    assert!(matches!(
        memory.sample_indices(1),
        Err(MemoryError::SamplingError(_))
    ));

    push_episode(&mut memory, 1, 3);
    assert_eq!(memory.used_size(), 1);
    assert!(matches!(
        memory.sample_indices(1),
        Err(MemoryError::SamplingError(_))
    ));

    push_episode(&mut memory, 2, 3);
    assert!(memory.sample_indices(1).is_ok());
    assert!(matches!(
        memory.sample_indices(3),
        Err(MemoryError::SamplingError(_))
    ));
    assert!(matches!(
        memory.sample_indices(0),
        Err(MemoryError::SamplingError(_))
    ));
}

#[test]
fn test_cursor_stays_in_bounds() {
    let mut memory = memory(2, 6);
    assert_eq!(memory.capacity(), 3);

    let mut slots = vec![];
    for tag in 0..10 {
        slots.push(memory.write_pointer());
        push_episode(&mut memory, tag, 1 + (tag as usize % 2));

        assert!(memory.used_size() <= memory.capacity() - 1);
        assert!(memory.write_pointer() <= memory.used_size());
        assert!(memory.write_pointer() < memory.capacity());
        assert_eq!(memory.local_step(), 0);
    }
    assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(memory.used_size(), 2);
    assert_eq!(memory.episode_count(), 10);

    // Slot 2 was last written by episode 8.
    let episode = memory.get_episode(2).unwrap();
    assert_eq!(episode.len(), 1);
    assert_eq!(leaf(&episode.fields, "action"), &TypedArray::from(vec![800i64]));
}

#[test]
fn test_long_episodes_are_split() {
    let mut memory = memory(4, 40);
    for t in 0..6 {
        memory.add_experience(&record(t, t == 5)).unwrap();
    }

    assert_eq!(memory.used_size(), 2);
    assert_eq!(memory.get_episode_lengths(&[0, 1]).unwrap(), vec![4, 2]);

    let first = memory.get_episode(0).unwrap();
    assert_eq!(
        leaf(&first.fields, "state_next/step"),
        &TypedArray::from(vec![0i32, 1, 2, 3])
    );
    assert_eq!(
        leaf(&first.fields, "done"),
        &TypedArray::from(vec![false, false, false, false])
    );

    let second = memory.get_episode(1).unwrap();
    assert_eq!(
        leaf(&second.fields, "reward"),
        &TypedArray::from(vec![4.0f32, 5.0])
    );
    assert_eq!(
        leaf(&second.fields, "done"),
        &TypedArray::from(vec![false, true])
    );
}

#[test]
fn test_get_experience() {
    let mut memory = memory(4, 40);
    push_episode(&mut memory, 1, 3);
    push_episode(&mut memory, 2, 4);

    let experience = memory.get_experience(1, 2).unwrap();
    assert_eq!(leaf(&experience, "action"), &TypedArray::from(202i64));
    assert_eq!(
        leaf(&experience, "state_next/position"),
        &TypedArray::from(vec![202.0f32, -202.0])
    );

    assert!(matches!(
        memory.get_experience(1, 4),
        Err(MemoryError::BackendError(_))
    ));
}

#[test]
fn test_invalid_record_leaves_memory_unchanged() {
    let mut memory = memory(4, 12);
    memory.add_experience(&record(0, false)).unwrap();
    let cursor = memory.cursor();

    let mut wrong_shape = record(1, false);
    wrong_shape
        .insert(
            "state_next",
            Tree::group(vec![
                ("position", Tree::leaf(TypedArray::from(vec![1.0f32, 2.0, 3.0]))),
                ("step", Tree::leaf(TypedArray::from(1i32))),
            ]),
        )
        .unwrap();
    assert!(matches!(
        memory.add_experience(&wrong_shape),
        Err(MemoryError::RecordError(_))
    ));

    let mut wrong_dtype = record(1, false);
    wrong_dtype
        .insert("reward", Tree::leaf(TypedArray::from(1.0f64)))
        .unwrap();
    assert!(matches!(
        memory.add_experience(&wrong_dtype),
        Err(MemoryError::RecordError(_))
    ));

    let missing = Tree::group(vec![
        ("action", Tree::leaf(TypedArray::from(1i64))),
        ("done", Tree::leaf(TypedArray::from(true))),
    ]);
    assert!(matches!(
        memory.add_experience(&missing),
        Err(MemoryError::RecordError(_))
    ));

    let mut extra = record(1, true);
    extra
        .insert("info", Tree::leaf(TypedArray::from(0u8)))
        .unwrap();
    assert!(matches!(
        memory.add_experience(&extra),
        Err(MemoryError::RecordError(_))
    ));

    assert_eq!(memory.cursor(), cursor);
    memory.add_experience(&record(1, true)).unwrap();
    assert_eq!(
        leaf(&memory.get_episode(0).unwrap().fields, "action"),
        &TypedArray::from(vec![0i64, 1])
    );
}

#[test]
fn test_sampled_indices_are_in_domain() {
    let mut memory = memory(5, 50);
    for tag in 0..6 {
        push_episode(&mut memory, tag, 2 + tag as usize % 4);
    }
    let used_size = memory.used_size();
    assert_eq!(used_size, 6);

    for _ in 0..100 {
        let ixs = memory.sample_indices(4).unwrap();
        assert_eq!(ixs.len(), 4);
        for ix in ixs {
            assert!(ix.episode >= 1 && ix.episode < used_size);
            let length = memory.get_episode_lengths(&[ix.episode]).unwrap()[0];
            assert!(ix.step >= 1 && ix.step <= length - 1);
        }
    }
}

#[test]
fn test_length_one_episodes_sample_step_one() {
    let mut memory = memory(3, 30);
    for tag in 0..4 {
        push_episode(&mut memory, tag, 1);
    }

    let (ixs, batch) = memory.sample_batch().unwrap();
    assert!(ixs.iter().all(|ix| ix.step == 1));
    assert_eq!(batch.len(), 2);
}

#[test]
fn test_sars_batch() {
    let mut memory = memory(5, 50);
    for tag in 0..6 {
        push_episode(&mut memory, tag, 5);
    }

    let (ixs, batch) = memory.sample_batch().unwrap();
    assert_eq!(ixs.len(), 2);
    assert_eq!(batch.ix_sample, ixs);
    assert_eq!(memory.sampled_indices(), Some(ixs.as_slice()));

    let mut keys = batch.fields.keys();
    keys.sort_unstable();
    assert_eq!(keys, vec!["action", "done", "reward", "state", "state_next"]);

    let position = batch.get("state/position").and_then(Tree::as_leaf).unwrap();
    assert_eq!(position.shape(), &[2, 2]);
    let action = batch.action().and_then(Tree::as_leaf).unwrap();
    assert_eq!(action.shape(), &[2]);

    for (i, ix) in ixs.iter().enumerate() {
        let current = memory.get_experience(ix.episode, ix.step).unwrap();
        let previous = memory.get_experience(ix.episode, ix.step - 1).unwrap();

        assert_eq!(&action.row(i).unwrap(), leaf(&current, "action"));
        for path in ["position", "step"].iter() {
            let state = batch.state().unwrap().get_path(path).and_then(Tree::as_leaf);
            let state_next = batch
                .state_next()
                .unwrap()
                .get_path(path)
                .and_then(Tree::as_leaf);
            assert_eq!(
                &state.unwrap().row(i).unwrap(),
                leaf(&previous, &format!("state_next/{}", path))
            );
            assert_eq!(
                &state_next.unwrap().row(i).unwrap(),
                leaf(&current, &format!("state_next/{}", path))
            );
        }
    }
}

#[test]
fn test_sars_batch_requires_sampled_indices() {
    let mut memory = memory(5, 50);
    for tag in 0..3 {
        push_episode(&mut memory, tag, 3);
    }
    assert!(matches!(
        memory.sample_sars_batch(),
        Err(MemoryError::SamplingError(_))
    ));

    let ixs = memory.sample_indices(2).unwrap();
    let batch = memory.sample_sars_batch().unwrap();
    assert_eq!(batch.ix_sample, ixs);
}

#[test]
fn test_gather_batch() {
    let mut memory = memory(4, 40);
    push_episode(&mut memory, 1, 4);
    push_episode(&mut memory, 2, 4);

    let ixs = vec![BatchIndex::new(1, 3), BatchIndex::new(0, 0)];
    let batch = memory.gather_batch(&ixs).unwrap();
    assert_eq!(leaf(&batch, "action"), &TypedArray::from(vec![203i64, 100]));
    assert_eq!(
        leaf(&batch, "state_next/position"),
        &TypedArray::from_shape_vec(&[2, 2], vec![203.0f32, -203.0, 100.0, -100.0]).unwrap()
    );
}

#[test]
fn test_sampling_is_deterministic() {
    let mut a = memory(5, 50);
    let mut b = memory(5, 50);
    for tag in 0..8 {
        push_episode(&mut a, tag, 5);
        push_episode(&mut b, tag, 5);
    }

    for _ in 0..10 {
        let (ixs_a, batch_a) = a.sample_batch().unwrap();
        let (ixs_b, batch_b) = b.sample_batch().unwrap();
        assert_eq!(ixs_a, ixs_b);
        assert_eq!(batch_a, batch_b);
    }
}

#[test]
fn test_replay_buffer_traits() {
    let config = EpisodicMemoryConfig::new(schema(), 3)
        .max_total_experiences(30)
        .seed(0);
    let mut memory = <NdarrayMemory as ReplayBufferBase>::build(&config).unwrap();
    assert!(memory.is_empty());

    for tag in 0..4 {
        for s in 0..3 {
            memory.push(record(100 * tag + s, s == 2)).unwrap();
        }
    }
    assert_eq!(ExperienceBufferBase::len(&memory), 4);

    let batch = memory.batch(3).unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(memory.sampled_indices(), Some(batch.ix_sample.as_slice()));
    let (fields, ix_sample) = batch.unpack();
    assert_eq!(ix_sample.len(), 3);
    assert!(fields.contains_key("state"));
}

#[test]
fn test_restore_cursor() {
    let mut memory = memory(4, 12);

    assert!(matches!(
        memory.set_used_size(4),
        Err(MemoryError::CapacityError(_))
    ));
    assert_eq!(
        memory.set_write_pointer(3).unwrap_err(),
        MemoryError::IndexError { index: 3, bound: 2 }
    );

    memory.set_used_size(2).unwrap();
    memory.set_write_pointer(2).unwrap();
    push_episode(&mut memory, 1, 2);
    assert_eq!(memory.get_episode_lengths(&[2]).unwrap(), vec![2]);
    assert_eq!(memory.write_pointer(), 0);
}

#[test]
fn test_restored_cursor_keeps_committing() {
    let mut memory = memory(4, 12);
    let capacity = memory.capacity();

    assert!(matches!(
        memory.set_used_size(capacity),
        Err(MemoryError::CapacityError(_))
    ));

    memory.set_used_size(capacity - 1).unwrap();
    memory.set_write_pointer(capacity - 1).unwrap();
    let mut slots = vec![];
    for tag in 0..(capacity + 1) {
        slots.push(memory.write_pointer());
        push_episode(&mut memory, tag as i32, 2);
        assert!(memory.write_pointer() < capacity);
        assert_eq!(memory.used_size(), capacity - 1);
    }
    assert_eq!(slots, vec![2, 0, 1, 2]);
    assert_eq!(memory.episode_count(), capacity + 1);
    assert_eq!(
        leaf(&memory.get_episode(2).unwrap().fields, "action"),
        &TypedArray::from(vec![300i64, 301])
    );
}

#[test]
fn test_flat_state_next_sars_batch() {
    let schema = Schema::new(Tree::group(vec![
        ("action", Tree::leaf(LeafSpec::f32(&[1]))),
        ("reward", Tree::leaf(LeafSpec::f32(&[]))),
        ("done", Tree::leaf(LeafSpec::scalar(DType::Bool))),
        ("state_next", Tree::leaf(LeafSpec::f32(&[4]))),
    ]))
    .unwrap();
    let config = EpisodicMemoryConfig::new(schema, 3)
        .max_total_experiences(9)
        .batch_size(1);
    let mut memory = NdarrayMemory::build(&config).unwrap();
    assert_eq!(memory.capacity(), 3);

    let record = |t: f32, done: bool| -> NdarrayRecord {
        Tree::group(vec![
            ("action", Tree::leaf(TypedArray::from(vec![t]))),
            ("reward", Tree::leaf(TypedArray::from(t))),
            ("done", Tree::leaf(TypedArray::from(done))),
            (
                "state_next",
                Tree::leaf(TypedArray::from(vec![t, t + 0.1, t + 0.2, t + 0.3])),
            ),
        ])
    };

    assert_eq!((memory.used_size(), memory.write_pointer()), (0, 0));
    for t in 0..3 {
        memory.add_experience(&record(t as f32, t == 2)).unwrap();
    }
    assert_eq!(memory.get_episode_lengths(&[0]).unwrap(), vec![3]);
    assert_eq!((memory.used_size(), memory.write_pointer()), (1, 1));

    for t in 10..13 {
        memory.add_experience(&record(t as f32, t == 12)).unwrap();
    }
    assert_eq!((memory.used_size(), memory.write_pointer()), (2, 2));

    for _ in 0..10 {
        let (ixs, batch) = memory.sample_batch().unwrap();
        let ix = ixs[0];
        assert_eq!(ix.episode, 1);
        assert!(ix.step == 1 || ix.step == 2);

        let state = batch.state().and_then(Tree::as_leaf).unwrap();
        assert_eq!(state.shape(), &[1, 4]);
        let previous = memory.get_experience(ix.episode, ix.step - 1).unwrap();
        assert_eq!(&state.row(0).unwrap(), leaf(&previous, "state_next"));

        let state_next = batch.state_next().and_then(Tree::as_leaf).unwrap();
        let current = memory.get_experience(ix.episode, ix.step).unwrap();
        assert_eq!(&state_next.row(0).unwrap(), leaf(&current, "state_next"));
    }
}

#[test]
fn test_build_from_yaml() {
    let yaml = r#"
schema:
  action:
    dtype: i64
  reward: {}
  done:
    dtype: bool
  state_next:
    position:
      dims: [2]
    step:
      dtype: i32
max_episode_length: 4
max_total_experiences: 12
seed: 3
"#;
    let config: EpisodicMemoryConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.schema, schema());
    assert_eq!(config.batch_size, 32);

    let mut memory = NdarrayMemory::build(&config).unwrap();
    push_episode(&mut memory, 1, 4);
    assert_eq!(memory.used_size(), 1);

    let stored = memory
        .get_episode(0)
        .unwrap()
        .get("state_next/position")
        .and_then(Tree::as_leaf)
        .unwrap()
        .read_slice(&[SliceIndex::At(3)])
        .unwrap();
    assert_eq!(stored, TypedArray::from(vec![103.0f32, -103.0]));
}
