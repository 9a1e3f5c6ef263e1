//! In-process [`GraphStore`].
//!
//! Nodes and relationships live in one `RwLock`-guarded state. Relationship adjacency is kept
//! per node and direction so degree maps and typed relationship scans never touch unrelated
//! entities.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use trellis_primitives::{Direction, Uuid, Value};

use crate::error::GraphError;
use crate::store::{
	EntityInfo, EntityKind, GraphStore, RelationshipDegree, RelationshipRecord,
};

struct StoredEntity {
	info: EntityInfo,
	properties: FxHashMap<String, Value>,
}

#[derive(Default)]
struct State {
	entities: FxHashMap<Uuid, StoredEntity>,
	relationships: FxHashMap<Uuid, RelationshipRecord>,
	outgoing: FxHashMap<Uuid, Vec<Uuid>>,
	incoming: FxHashMap<Uuid, Vec<Uuid>>,
}

/// Thread-safe in-memory graph.
#[derive(Default)]
pub struct MemoryGraph {
	state: RwLock<State>,
}

impl MemoryGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a node of the given type and returns its id.
	///
	/// The `id` and `type` properties are written as part of creation.
	pub fn create_node(&self, type_name: &str) -> Uuid {
		let id = Uuid::new_v4();
		let mut properties = FxHashMap::default();
		properties.insert("id".to_string(), Value::Id(id));
		properties.insert("type".to_string(), Value::from(type_name));
		self.state.write().entities.insert(
			id,
			StoredEntity {
				info: EntityInfo {
					id,
					kind: EntityKind::Node,
					type_name: type_name.to_string(),
				},
				properties,
			},
		);
		id
	}

	/// Creates a relationship between two existing nodes.
	///
	/// `type_name` is the registered relationship type, `rel_type` the storage label.
	pub fn create_relationship(
		&self,
		type_name: &str,
		rel_type: &str,
		source: Uuid,
		target: Uuid,
	) -> Result<Uuid, GraphError> {
		let mut state = self.state.write();
		for node in [source, target] {
			match state.entities.get(&node) {
				Some(e) if e.info.kind == EntityKind::Node => {}
				Some(_) => {
					return Err(GraphError::WrongKind {
						id: node,
						expected: EntityKind::Node,
					});
				}
				None => return Err(GraphError::NotFound { id: node }),
			}
		}

		let id = Uuid::new_v4();
		let mut properties = FxHashMap::default();
		properties.insert("id".to_string(), Value::Id(id));
		properties.insert("type".to_string(), Value::from(type_name));
		properties.insert("relType".to_string(), Value::from(rel_type));
		properties.insert("sourceId".to_string(), Value::Id(source));
		properties.insert("targetId".to_string(), Value::Id(target));

		state.entities.insert(
			id,
			StoredEntity {
				info: EntityInfo {
					id,
					kind: EntityKind::Relationship,
					type_name: type_name.to_string(),
				},
				properties,
			},
		);
		state.relationships.insert(
			id,
			RelationshipRecord {
				id,
				type_name: type_name.to_string(),
				rel_type: rel_type.to_string(),
				source,
				target,
			},
		);
		state.outgoing.entry(source).or_default().push(id);
		state.incoming.entry(target).or_default().push(id);
		Ok(id)
	}

	/// Deletes a relationship.
	pub fn delete_relationship(&self, id: Uuid) -> Result<(), GraphError> {
		let mut state = self.state.write();
		let Some(rel) = state.relationships.remove(&id) else {
			return Err(GraphError::NotFound { id });
		};
		state.entities.remove(&id);
		if let Some(list) = state.outgoing.get_mut(&rel.source) {
			list.retain(|r| *r != id);
		}
		if let Some(list) = state.incoming.get_mut(&rel.target) {
			list.retain(|r| *r != id);
		}
		Ok(())
	}

	/// Deletes a node together with every relationship attached to it.
	pub fn delete_node(&self, id: Uuid) -> Result<(), GraphError> {
		let attached: Vec<Uuid> = {
			let state = self.state.read();
			match state.entities.get(&id) {
				Some(e) if e.info.kind == EntityKind::Node => {}
				Some(_) => {
					return Err(GraphError::WrongKind {
						id,
						expected: EntityKind::Node,
					});
				}
				None => return Err(GraphError::NotFound { id }),
			}
			let mut attached: Vec<Uuid> = state.outgoing.get(&id).cloned().unwrap_or_default();
			for rel in state.incoming.get(&id).into_iter().flatten() {
				if !attached.contains(rel) {
					attached.push(*rel);
				}
			}
			attached
		};
		for rel in attached {
			self.delete_relationship(rel)?;
		}
		let mut state = self.state.write();
		state.entities.remove(&id);
		state.outgoing.remove(&id);
		state.incoming.remove(&id);
		Ok(())
	}

	/// Returns the number of stored nodes.
	pub fn node_count(&self) -> usize {
		self.state
			.read()
			.entities
			.values()
			.filter(|e| e.info.kind == EntityKind::Node)
			.count()
	}
}

fn collect(state: &State, ids: Option<&Vec<Uuid>>, type_name: Option<&str>, out: &mut Vec<RelationshipRecord>) {
	for id in ids.into_iter().flatten() {
		if let Some(rel) = state.relationships.get(id) {
			if type_name.is_none_or(|t| t == rel.type_name) && !out.iter().any(|r| r.id == rel.id) {
				out.push(rel.clone());
			}
		}
	}
}

impl GraphStore for MemoryGraph {
	fn entity(&self, id: Uuid) -> Option<EntityInfo> {
		self.state.read().entities.get(&id).map(|e| e.info.clone())
	}

	fn get_property(&self, id: Uuid, key: &str) -> Option<Value> {
		self.state
			.read()
			.entities
			.get(&id)
			.and_then(|e| e.properties.get(key).cloned())
	}

	fn set_property(&self, id: Uuid, key: &str, value: Option<Value>) -> Result<Option<Value>, GraphError> {
		let mut state = self.state.write();
		let entity = state.entities.get_mut(&id).ok_or(GraphError::NotFound { id })?;
		Ok(match value {
			Some(v) => entity.properties.insert(key.to_string(), v),
			None => entity.properties.remove(key),
		})
	}

	fn property_names(&self, id: Uuid) -> Vec<String> {
		let state = self.state.read();
		let mut names: Vec<String> = state
			.entities
			.get(&id)
			.map(|e| e.properties.keys().cloned().collect())
			.unwrap_or_default();
		names.sort();
		names
	}

	fn relationship(&self, id: Uuid) -> Option<RelationshipRecord> {
		self.state.read().relationships.get(&id).cloned()
	}

	fn relationships(
		&self,
		node: Uuid,
		direction: Direction,
		type_name: Option<&str>,
	) -> Vec<RelationshipRecord> {
		let state = self.state.read();
		let mut out = Vec::new();
		if matches!(direction, Direction::Outgoing | Direction::Both) {
			collect(&state, state.outgoing.get(&node), type_name, &mut out);
		}
		if matches!(direction, Direction::Incoming | Direction::Both) {
			collect(&state, state.incoming.get(&node), type_name, &mut out);
		}
		out
	}

	fn degree(&self, node: Uuid) -> Vec<RelationshipDegree> {
		let state = self.state.read();
		let mut degrees: Vec<RelationshipDegree> = Vec::new();
		let sides = [
			(Direction::Outgoing, state.outgoing.get(&node)),
			(Direction::Incoming, state.incoming.get(&node)),
		];
		for (direction, ids) in sides {
			for id in ids.into_iter().flatten() {
				let Some(rel) = state.relationships.get(id) else {
					continue;
				};
				match degrees
					.iter_mut()
					.find(|d| d.direction == direction && d.type_name == rel.type_name)
				{
					Some(d) => d.count += 1,
					None => degrees.push(RelationshipDegree {
						type_name: rel.type_name.clone(),
						direction,
						count: 1,
					}),
				}
			}
		}
		degrees
	}
}
