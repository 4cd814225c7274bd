pub mod alignment;
pub mod annotate;
pub mod blast_xml;
pub mod cluster;
pub mod error;
pub mod evalue;
pub mod gff;
pub mod hit;
pub mod io;
pub mod rbb;
