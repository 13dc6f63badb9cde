//! Static page content. Nothing in the runtime branches on it beyond
//! iteration and counting.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::nav::Section;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub tagline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    pub description: String,
    pub image: String,
    pub tech: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    /// Proficiency in percent, 0 to 100.
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub category: String,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub school: String,
    pub period: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub position: String,
    pub company: String,
    pub period: String,
    pub description: String,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Email,
    Phone,
    Availability,
    Link,
}

impl ContactKind {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "availability" => Ok(Self::Availability),
            "link" => Ok(Self::Link),
            other => Err(anyhow!("unknown contact kind {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub kind: ContactKind,
    pub label: String,
    pub value: String,
    /// The link points at a file the browser should download.
    pub download: bool,
}

/// Everything the page displays besides the hero animation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteContent {
    pub profile: Profile,
    pub projects: Vec<Project>,
    pub skills: Vec<SkillCategory>,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub contacts: Vec<Contact>,
}

impl SiteContent {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::from_xml(&text).with_context(|| format!("invalid content file {}", path.display()))
    }

    pub fn from_xml(text: &str) -> Result<Self> {
        let document = Document::parse(text).context("content is not well-formed XML")?;
        let root = document.root_element();
        if !root.has_tag_name("site") {
            return Err(anyhow!(
                "expected <site> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let profile = match children(root, "profile").next() {
            Some(node) => Profile {
                name: required_text(node, "name")?,
                tagline: required_text(node, "tagline")?,
            },
            None => return Err(anyhow!("missing <profile>")),
        };

        let projects = children(root, "project")
            .map(parse_project)
            .collect::<Result<Vec<_>>>()?;
        let skills = children(root, "skills")
            .map(parse_skill_category)
            .collect::<Result<Vec<_>>>()?;
        let education = children(root, "education")
            .map(|node| {
                Ok(Education {
                    degree: required_text(node, "degree")?,
                    school: required_text(node, "school")?,
                    period: required_text(node, "period")?,
                    description: optional_text(node, "description"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let experience = children(root, "experience")
            .map(|node| {
                Ok(Experience {
                    position: required_text(node, "position")?,
                    company: required_text(node, "company")?,
                    period: required_text(node, "period")?,
                    description: optional_text(node, "description"),
                    achievements: children(node, "achievement").map(node_text).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let contacts = children(root, "contact")
            .map(parse_contact)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            profile,
            projects,
            skills,
            education,
            experience,
            contacts,
        })
    }

    /// Number of entries shown in `section`.
    pub fn section_items(&self, section: Section) -> usize {
        match section {
            Section::About => 1,
            Section::Projects => self.projects.len(),
            Section::Skills => self.skills.iter().map(|category| category.skills.len()).sum(),
            Section::Education => self.education.len(),
            Section::Experience => self.experience.len(),
            Section::Connect => self.contacts.len(),
        }
    }
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.is_element() && child.has_tag_name(tag))
}

fn node_text(node: Node<'_, '_>) -> String {
    node.text().unwrap_or_default().trim().to_string()
}

fn required_text(node: Node<'_, '_>, tag: &str) -> Result<String> {
    children(node, tag)
        .next()
        .map(node_text)
        .ok_or_else(|| anyhow!("<{}> is missing <{tag}>", node.tag_name().name()))
}

fn optional_text(node: Node<'_, '_>, tag: &str) -> String {
    children(node, tag).next().map(node_text).unwrap_or_default()
}

fn parse_project(node: Node<'_, '_>) -> Result<Project> {
    let tech = optional_text(node, "tech")
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Project {
        title: required_text(node, "title")?,
        description: optional_text(node, "description"),
        image: optional_text(node, "image"),
        tech,
    })
}

fn parse_skill_category(node: Node<'_, '_>) -> Result<SkillCategory> {
    let category = node
        .attribute("category")
        .ok_or_else(|| anyhow!("<skills> is missing the category attribute"))?
        .to_string();
    let skills = children(node, "skill")
        .map(|skill| {
            let raw = skill.attribute("level").unwrap_or("0");
            let level: i64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid skill level {raw:?}"))?;
            Ok(Skill {
                name: node_text(skill),
                level: level.clamp(0, 100) as u8,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SkillCategory { category, skills })
}

fn parse_contact(node: Node<'_, '_>) -> Result<Contact> {
    let kind = ContactKind::parse(node.attribute("kind").unwrap_or("link"))?;
    Ok(Contact {
        kind,
        label: required_text(node, "label")?,
        value: required_text(node, "value")?,
        download: children(node, "download").next().is_some(),
    })
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn project(title: &str, description: &str, image: &str, tech: &[&str]) -> Project {
    Project {
        title: title.into(),
        description: description.into(),
        image: image.into(),
        tech: strings(tech),
    }
}

fn category(name: &str, skills: &[(&str, u8)]) -> SkillCategory {
    SkillCategory {
        category: name.into(),
        skills: skills
            .iter()
            .map(|&(name, level)| Skill {
                name: name.into(),
                level,
            })
            .collect(),
    }
}

fn contact(kind: ContactKind, label: &str, value: &str, download: bool) -> Contact {
    Contact {
        kind,
        label: label.into(),
        value: value.into(),
        download,
    }
}

impl Default for SiteContent {
    fn default() -> Self {
        Self {
            profile: Profile {
                name: "Muhammad Talhah".into(),
                tagline: "Full Stack Developer | Embedded Systems Engineer | App Developer".into(),
            },
            projects: vec![
                project(
                    "ASK GPT",
                    "A desktop app whose sole purpose is to visualize the results of users prompts using knowledge graphs and statistics like relevance and sentiment, giving the user deep insights into their query.",
                    "./askgpt.jpg",
                    &["Flutter", "Google Maps API", "Bluetooth", "ESP32"],
                ),
                project(
                    "Smart Motorcycle HUD",
                    "A heads-up display for motorcycle helmets that shows turn-by-turn directions using an ESP32 and mobile app integration.",
                    "./HUD.jpg",
                    &["Flutter", "ESP32", "Bluetooth", "Google Maps API"],
                ),
                project(
                    "Driver Behavior Analysis",
                    "Analyzes OBD data from a car and uses ML models to classify driving style, check car health and provide improvement tips.",
                    "./DRIVER4.png",
                    &["Python", "Machine Learning", "OBD-II", "Pandas"],
                ),
                project(
                    "Air Quality Monitoring System",
                    "Built an IoT-based air quality system using MQ sensors to monitor pollution levels and alert users in real-time.",
                    "./AQMS.jpg",
                    &["Arduino", "MQ-135", "ESP8266", "OLED Display"],
                ),
                project(
                    "Portfolio Website",
                    "My personal portfolio website to showcase projects, skills, and resume with a clean, responsive UI.",
                    "./portfolio.png",
                    &["React", "Tailwind CSS", "JavaScript", "three.js"],
                ),
                project(
                    "MDL - Music Downloader",
                    "A desktop app made entirely out of python that acts as a music downloader.",
                    "./MDL2.png",
                    &["Python", "PySimpleGUI", "pytube", "spotipy"],
                ),
            ],
            skills: vec![
                category(
                    "Full Stack & App Development",
                    &[
                        ("Python", 90),
                        ("Java", 75),
                        ("Flutter", 55),
                        ("JavaScript", 60),
                        ("React", 60),
                        ("HTML/CSS", 85),
                        ("SQL", 90),
                    ],
                ),
                category(
                    "Embedded Systems & IoT",
                    &[
                        ("Arduino", 75),
                        ("FPGA", 70),
                        ("RTOS", 65),
                        ("VLSI", 50),
                        ("Sensor Integration (MQ, OBD)", 80),
                        ("C/C++", 80),
                        ("Microcontroller Debugging", 90),
                    ],
                ),
                category(
                    "Tools & Design",
                    &[
                        ("AWS", 45),
                        ("Solidity", 65),
                        ("Blender", 75),
                        ("Unreal Engine", 60),
                        ("Figma", 75),
                        ("UI/UX Design", 85),
                        ("Git & GitHub", 70),
                    ],
                ),
            ],
            education: vec![
                Education {
                    degree: "Bachelor of Technology in Electronics and Computer Engineering".into(),
                    school: "vellore Institute of Technology".into(),
                    period: "2021 - 2025".into(),
                    description: "Focused on embedded systems and machine-learning. graduated with honors.".into(),
                },
                Education {
                    degree: "Competitive Problem Solving".into(),
                    school: "HackerRank".into(),
                    period: "Ongoing".into(),
                    description: "Consistently participating in coding challenges and competitions on HackerRank to improve problem-solving skills in algorithms, data structures, and system design.".into(),
                },
                Education {
                    degree: "AWS Cloud Certification".into(),
                    school: "AWS Training & Certification".into(),
                    period: "Ongoing".into(),
                    description: "Currently pursuing AWS Cloud Certification to deepen knowledge in cloud computing, architecture, and services such as EC2, S3, Lambda, and AWS management tools.".into(),
                },
            ],
            experience: vec![
                Experience {
                    position: "Software Developer Intern".into(),
                    company: "Coginnova Asia".into(),
                    period: "September 2023 - November 2023".into(),
                    description: "Interned at Coginnova Asia for a duration of 2 months as part of academic requirement.".into(),
                    achievements: strings(&[
                        "Created desktop app using python that uses OpenAI API to visualize GPT responses to user queries.",
                        "Created a C# based Smart Contract library that consisted of rudimentary function that help users execute and check smart contracts",
                    ]),
                },
                Experience {
                    position: "Software Developer Intern".into(),
                    company: "T3C Technologies".into(),
                    period: "2025 - Present".into(),
                    description: "Built responsive and interactives 3D websites using React and Three.js".into(),
                    achievements: strings(&[
                        "Developed a personal portfolio for client using React",
                        "Developed a personal portfolio for myself",
                    ]),
                },
                Experience {
                    position: "Systems Engineer".into(),
                    company: "TCS".into(),
                    period: "yet to start".into(),
                    description: "Offer accepted, yet to join. Preparing for role responsibilities in systems engineering, focusing on improving technical processes and contributing to software development.".into(),
                    achievements: Vec::new(),
                },
            ],
            contacts: vec![
                contact(ContactKind::Email, "Email", "mtalhah@gmail.com", false),
                contact(ContactKind::Phone, "Phone", "+91 9597095957", false),
                contact(
                    ContactKind::Availability,
                    "Available for",
                    "Freelance, Full-time opportunities",
                    false,
                ),
                contact(ContactKind::Link, "GitHub", "https://github.com/mtalhah", false),
                contact(
                    ContactKind::Link,
                    "LinkedIn",
                    "https://www.linkedin.com/in/muhammad-talhah-45b31b27b/",
                    false,
                ),
                contact(
                    ContactKind::Link,
                    "Instagram",
                    "https://www.instagram.com/mtalhahh?igsh=MW1ubDI0N3Qyeml2cA==",
                    false,
                ),
                contact(ContactKind::Link, "Download CV", "/RESUME.pdf", true),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    static SAMPLE: Lazy<String> = Lazy::new(|| {
        r#"<site>
  <profile><name>Ada</name><tagline>Engines</tagline></profile>
  <project>
    <title>Analytical Engine</title>
    <description>Mechanical computer</description>
    <tech>Brass, Steam , </tech>
  </project>
  <skills category="Mathematics">
    <skill level="95">Analysis</skill>
    <skill level="140">Notes</skill>
    <skill level="-5">Poetry</skill>
  </skills>
  <education><degree>Tutoring</degree><school>Home</school><period>1820s</period></education>
  <experience>
    <position>Translator</position><company>Taylor</company><period>1843</period>
    <achievement>Note G</achievement>
  </experience>
  <contact kind="link"><label>CV</label><value>/cv.pdf</value><download/></contact>
</site>"#
            .to_string()
    });

    #[test]
    fn default_content_mirrors_the_page() {
        let content = SiteContent::default();
        assert_eq!(content.projects.len(), 6);
        assert_eq!(content.section_items(Section::Skills), 21);
        assert_eq!(content.education.len(), 3);
        assert_eq!(content.experience[2].achievements.len(), 0);
        assert!(content.contacts.iter().any(|contact| contact.download));
    }

    #[test]
    fn parses_every_record_kind() {
        let content = SiteContent::from_xml(&SAMPLE).unwrap();
        assert_eq!(content.profile.name, "Ada");
        assert_eq!(content.projects[0].tech, vec!["Brass", "Steam"]);
        assert_eq!(content.projects[0].image, "");
        let levels: Vec<u8> = content.skills[0].skills.iter().map(|skill| skill.level).collect();
        assert_eq!(levels, vec![95, 100, 0]);
        assert_eq!(content.education[0].description, "");
        assert_eq!(content.experience[0].achievements, vec!["Note G"]);
        assert!(content.contacts[0].download);
        assert_eq!(content.contacts[0].kind, ContactKind::Link);
    }

    #[test]
    fn missing_required_tags_are_errors() {
        let err = SiteContent::from_xml(
            "<site><profile><name>A</name><tagline>B</tagline></profile><project/></site>",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("<project> is missing <title>"));
        assert!(SiteContent::from_xml("<site/>").is_err());
        assert!(SiteContent::from_xml("<page/>").is_err());
        assert!(SiteContent::from_xml("<site>").is_err());
    }

    #[test]
    fn load_reports_the_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let content = SiteContent::load(file.path()).unwrap();
        assert_eq!(content.section_items(Section::Connect), 1);

        let missing = SiteContent::load("/definitely/not/here.xml").unwrap_err();
        assert!(missing.to_string().contains("not/here.xml"));
    }
}
