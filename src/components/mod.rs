pub mod security_graph;
